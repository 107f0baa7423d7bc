//! GPU tone mapping of HDR layers for panels without pipe tone mapping.

use {
    crate::{
        error::EngineError, flags::LR_TONE_MAP, stack::LayerStackSnapshot,
        utils::errorfmt::ErrorFmt,
    },
    std::rc::Rc,
};

pub trait ToneMapper {
    /// Renders the tone mapped layers before the stack is committed.
    fn handle(&self, stack: &mut LayerStackSnapshot) -> Result<(), EngineError>;

    fn terminate(&self);

    fn is_active(&self) -> bool;

    fn post_commit(&self, stack: &LayerStackSnapshot) {
        let _ = stack;
    }

    fn set_frame_dump_config(&self, count: u32) {
        let _ = count;
    }
}

/// Whether any layer in the stack was marked for tone mapping by the engine.
pub fn needs_tone_map(stack: &LayerStackSnapshot) -> bool {
    stack
        .layers
        .iter()
        .any(|l| l.requests.contains(LR_TONE_MAP))
}

pub(crate) fn handle_tone_map(
    tone_mapper: Option<&Rc<dyn ToneMapper>>,
    stack: &mut LayerStackSnapshot,
) {
    let Some(tm) = tone_mapper else {
        return;
    };
    if needs_tone_map(stack) {
        if let Err(e) = tm.handle(stack) {
            log::error!("Could not tone map the stack: {}", ErrorFmt(e));
        }
    } else {
        tm.terminate();
    }
}
