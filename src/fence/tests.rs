use {crate::fence::SyncFile, uapi::c};

fn eventfd() -> SyncFile {
    SyncFile::new(uapi::eventfd(0, c::EFD_CLOEXEC).unwrap())
}

#[test]
fn unsignaled_times_out() {
    let fence = eventfd();
    assert!(!fence.wait(0).unwrap());
    assert!(!fence.is_signaled());
}

#[test]
fn signaled() {
    let fence = eventfd();
    uapi::eventfd_write(fence.raw(), 1).unwrap();
    assert!(fence.wait(10).unwrap());
    assert!(fence.is_signaled());
}

#[test]
fn clones_are_the_same() {
    let fence = eventfd();
    let other = fence.clone();
    assert!(fence.same(&other));
    assert!(!fence.same(&eventfd()));
}
