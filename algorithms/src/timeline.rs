#[cfg(test)]
mod tests;

/// Marker for "no pending vsync time".
pub const NO_VSYNC_TIME: i64 = i64::MAX;

/// When a vsync period change will be latched and when it becomes visible.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct VsyncTimeline {
    pub refresh_time: i64,
    pub applied_time: i64,
}

/// Estimates the refresh and applied times of a vsync period change.
///
/// The activation period is `vsync_period * vsyncs_to_apply`. A desired time in the
/// past is served at the current vsync boundary, one inside the activation window
/// one vsync early, and any other one exactly one activation period ahead of it.
pub fn estimate_vsync_timeline(
    now: i64,
    vsync_period: i64,
    vsyncs_to_apply: u32,
    desired_time: i64,
) -> VsyncTimeline {
    if vsync_period <= 0 {
        return VsyncTimeline {
            refresh_time: now,
            applied_time: now,
        };
    }
    let delta = desired_time.saturating_sub(now);
    let activate = vsync_period.saturating_mul(vsyncs_to_apply as i64);
    let refresh_time = if delta < 0 {
        now + delta % vsync_period
    } else if delta < activate {
        now + delta % vsync_period - vsync_period
    } else {
        desired_time - activate
    };
    VsyncTimeline {
        refresh_time,
        applied_time: refresh_time.saturating_add(activate),
    }
}

pub fn is_time_after_or_equal_vsync(time: i64, vsync_time: i64) -> bool {
    vsync_time != NO_VSYNC_TIME && time >= vsync_time
}
