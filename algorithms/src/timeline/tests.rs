use crate::timeline::{NO_VSYNC_TIME, estimate_vsync_timeline, is_time_after_or_equal_vsync};

const PERIOD: i64 = 16_666_666;

#[test]
fn desired_in_past() {
    let now = 1_000_000_000;
    for delta in [-1, -PERIOD + 1, -PERIOD, -5 * PERIOD - 17] {
        let tl = estimate_vsync_timeline(now, PERIOD, 1, now + delta);
        assert_eq!(tl.refresh_time, now + delta % PERIOD);
        assert!(now - tl.refresh_time < PERIOD);
        assert!(tl.refresh_time <= now);
        assert_eq!(tl.applied_time, tl.refresh_time + PERIOD);
    }
}

#[test]
fn desired_inside_activation_window() {
    let now = 1_000_000_000;
    let tl = estimate_vsync_timeline(now, PERIOD, 2, now + PERIOD + 10);
    assert_eq!(tl.refresh_time, now + 10 - PERIOD);
    assert_eq!(tl.applied_time, tl.refresh_time + 2 * PERIOD);
}

#[test]
fn desired_far_in_future() {
    let now = 1_000_000_000;
    let desired = now + 10 * PERIOD;
    let tl = estimate_vsync_timeline(now, PERIOD, 1, desired);
    assert_eq!(tl.refresh_time, desired - PERIOD);
    assert_eq!(tl.applied_time, desired);
}

#[test]
fn vsync_time_comparison() {
    assert!(!is_time_after_or_equal_vsync(i64::MAX, NO_VSYNC_TIME));
    assert!(is_time_after_or_equal_vsync(10, 10));
    assert!(is_time_after_or_equal_vsync(11, 10));
    assert!(!is_time_after_or_equal_vsync(9, 10));
}
