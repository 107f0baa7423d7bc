use {crate::display::DisplayId, hwc_algorithms::timeline::VsyncTimeline};

/// When a vsync period change is latched, whether the client has to refresh
/// for it, and when the new period becomes visible.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct VsyncPeriodChangeTimeline {
    pub timeline: VsyncTimeline,
    pub refresh_required: bool,
}

/// The upstream windowing system.
pub trait CallbackSink {
    /// Requests a new validate/commit cycle.
    fn refresh(&self, display: DisplayId);

    fn vsync(&self, display: DisplayId, timestamp: i64, period_ns: i64) {
        let _ = display;
        let _ = timestamp;
        let _ = period_ns;
    }

    fn vsync_period_timing_changed(&self, display: DisplayId, timeline: VsyncPeriodChangeTimeline) {
        let _ = display;
        let _ = timeline;
    }

    fn notify_idle_status(&self, display: DisplayId, idle: bool) {
        let _ = display;
        let _ = idle;
    }

    fn vsync_callback_registered(&self) -> bool {
        true
    }
}
