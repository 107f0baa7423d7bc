use uapi::c;

/// The monotonic clock in nanoseconds. Vsync timestamps and config change
/// deadlines share this clock.
pub fn now_nsec() -> i64 {
    let mut time: c::timespec = uapi::pod_zeroed();
    let _ = uapi::clock_gettime(c::CLOCK_MONOTONIC, &mut time);
    time.tv_sec as i64 * 1_000_000_000 + time.tv_nsec as i64
}
