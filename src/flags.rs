//! The bit spaces tracked per layer and per stack.
//!
//! Layer-level state, stack-level state, geometry changes and update reasons
//! are kept as distinct types so that they cannot be mixed up.

bitflags! {
    /// Geometry attributes changed since the last successful commit.
    pub struct GeometryChanges(pub u32) {
        pub const GC_BLEND_MODE = 1 << 0,
        pub const GC_DATASPACE = 1 << 1,
        pub const GC_DISPLAY_FRAME = 1 << 2,
        pub const GC_PLANE_ALPHA = 1 << 3,
        pub const GC_SOURCE_CROP = 1 << 4,
        pub const GC_TRANSFORM = 1 << 5,
        pub const GC_Z_ORDER = 1 << 6,
        pub const GC_ADDED = 1 << 7,
        pub const GC_REMOVED = 1 << 8,
        pub const GC_BUFFER_GEOMETRY = 1 << 9,
        pub const GC_COLOR_TRANSFORM = 1 << 10,
        pub const GC_LAYER_BRIGHTNESS = 1 << 11,
    }
}

bitflags! {
    /// Reasons why a layer requires revalidation that are not geometry.
    pub struct LayerUpdates(pub u32) {
        pub const LU_SECURITY = 1 << 0,
        pub const LU_METADATA = 1 << 1,
        pub const LU_SURFACE_DAMAGE = 1 << 2,
        pub const LU_SURFACE_INVALIDATE = 1 << 3,
        pub const LU_CLIENT_COMP_REQUEST = 1 << 4,
        pub const LU_COLOR_TRANSFORM = 1 << 5,
        pub const LU_CONTENT_METADATA = 1 << 6,
    }
}

bitflags! {
    /// Per-frame classification of a layer computed by the stack builder.
    pub struct LayerFlags(pub u32) {
        pub const LF_SKIP = 1 << 0,
        pub const LF_SOLID_FILL = 1 << 1,
        pub const LF_CURSOR = 1 << 2,
        pub const LF_FRONT_BUFFER = 1 << 3,
        pub const LF_SINGLE_BUFFER = 1 << 4,
        pub const LF_GAME = 1 << 5,
        pub const LF_UPDATING = 1 << 6,
        pub const LF_COLOR_TRANSFORM = 1 << 7,
        pub const LF_HAS_METADATA_REFRESH_RATE = 1 << 8,
        pub const LF_COMPATIBLE = 1 << 9,
    }
}

bitflags! {
    pub struct BufferFlags(pub u32) {
        pub const BF_SECURE = 1 << 0,
        pub const BF_VIDEO = 1 << 1,
        pub const BF_HDR = 1 << 2,
        pub const BF_MASK_LAYER = 1 << 3,
        pub const BF_SECURE_CAMERA = 1 << 4,
        pub const BF_SECURE_DISPLAY = 1 << 5,
    }
}

bitflags! {
    /// The logical OR over all layers of a stack.
    pub struct StackFlags(pub u32) {
        pub const SF_HDR_PRESENT = 1 << 0,
        pub const SF_SECURE_PRESENT = 1 << 1,
        pub const SF_CURSOR_PRESENT = 1 << 2,
        pub const SF_SKIP_PRESENT = 1 << 3,
        pub const SF_SCALING_RGB_PRESENT = 1 << 4,
        pub const SF_FRONT_BUFFER_PRESENT = 1 << 5,
        pub const SF_SINGLE_BUFFER_PRESENT = 1 << 6,
        pub const SF_MASK_PRESENT = 1 << 7,
        pub const SF_VIDEO_PRESENT = 1 << 8,
        pub const SF_GEOMETRY_CHANGED = 1 << 9,
        pub const SF_ANIMATING = 1 << 10,
        pub const SF_GAME_PRESENT = 1 << 11,
    }
}

bitflags! {
    /// Requests the engine attaches to individual layers during prepare.
    pub struct LayerRequests(pub u32) {
        pub const LR_TONE_MAP = 1 << 0,
        pub const LR_FLIP_BUFFER = 1 << 1,
    }
}

bitflags! {
    /// Display requests as reported to the client.
    pub struct DisplayRequests(pub u32) {
        pub const DR_FLIP_CLIENT_TARGET = 1 << 0,
        pub const DR_WRITE_CLIENT_TARGET_TO_OUTPUT = 1 << 1,
    }
}

bitflags! {
    pub struct LayerRequestFlags(pub u32) {
        pub const LRF_CLEAR_CLIENT_TARGET = 1 << 0,
    }
}

bitflags! {
    /// Active secure sessions.
    pub struct SecureSessions(pub u32) {
        pub const SS_SECURE_DISPLAY = 1 << 0,
        pub const SS_SECURE_CAMERA = 1 << 1,
    }
}
