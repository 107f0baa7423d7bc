use {
    crate::{
        display::DisplayId,
        fence::SyncFile,
        readback::{CwbClient, CwbEventHandler, CwbStatus, CwbWait, ReadbackCoordinator},
    },
    parking_lot::Mutex,
    std::{
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering::Relaxed},
        },
        thread,
        time::Duration,
    },
    uapi::c,
};

fn fence() -> SyncFile {
    SyncFile::new(uapi::eventfd(1, c::EFD_CLOEXEC).unwrap())
}

fn coordinator() -> Arc<ReadbackCoordinator> {
    ReadbackCoordinator::new(DisplayId::from_raw(1), None)
}

#[test]
fn frame_dump_fence_is_delivered_once() {
    let rc = coordinator();
    rc.register(0xabcd, CwbClient::FrameDump);
    let f = fence();
    rc.notify_cwb_done(0, 0xabcd, Some(f.clone()));
    assert!(!rc.is_registered(0xabcd));
    let (status, out) = rc.fence_for_client(CwbClient::FrameDump, None, None);
    assert_eq!(status, CwbStatus::Signaled);
    assert!(out.unwrap().same(&f));
    assert_eq!(rc.status_of(CwbClient::FrameDump), None);
    let (status, out) = rc.fence_for_client(CwbClient::FrameDump, None, None);
    assert_eq!(status, CwbStatus::NotAvailable);
    assert!(out.is_none());
}

#[test]
fn invalid_client() {
    let rc = coordinator();
    let (status, _) = rc.fence_for_client(CwbClient::None, None, Some(fence()));
    assert_eq!(status, CwbStatus::UnknownError);
}

#[test]
fn notification_status() {
    let rc = coordinator();
    rc.notify_cwb_done(0, 1, None);
    assert_eq!(rc.status_of(CwbClient::Composer), None);
    rc.register(1, CwbClient::Composer);
    rc.notify_cwb_done(-c::ETIME, 1, Some(fence()));
    assert_eq!(rc.status_of(CwbClient::Composer), Some(CwbStatus::TimedOut));
    rc.register(2, CwbClient::Color);
    rc.notify_cwb_done(-c::EINVAL, 2, None);
    assert_eq!(rc.status_of(CwbClient::Color), Some(CwbStatus::UnknownError));
    let (status, out) = rc.fence_for_client(CwbClient::Composer, None, None);
    assert_eq!(status, CwbStatus::TimedOut);
    assert!(out.is_some());
}

#[test]
fn configured_output_buffer() {
    let rc = coordinator();
    rc.register(5, CwbClient::Composer);
    let (status, out) = rc.fence_for_client(CwbClient::Composer, Some(5), None);
    assert_eq!(status, CwbStatus::Pending);
    assert!(out.is_none());
    assert!(rc.is_registered(5));
    let (status, out) = rc.fence_for_client(CwbClient::Color, Some(5), Some(fence()));
    assert_eq!(status, CwbStatus::NotAvailable);
    assert!(out.is_none());
    let (status, out) = rc.fence_for_client(CwbClient::Composer, Some(5), Some(fence()));
    assert_eq!(status, CwbStatus::NotChecked);
    assert!(out.is_some());
    assert!(!rc.is_registered(5));
}

#[test]
fn early_call_discards_engine_fence() {
    let rc = coordinator();
    rc.register(9, CwbClient::External);
    let (status, out) = rc.fence_for_client(CwbClient::External, None, Some(fence()));
    assert_eq!(status, CwbStatus::Pending);
    assert!(out.is_none());
    assert!(rc.is_registered(9));
    assert!(rc.has_pending_requests());
}

#[test]
fn not_checked_response_uses_engine_fence() {
    let rc = coordinator();
    rc.register(3, CwbClient::Composer);
    assert_eq!(rc.frame_output_client(Some(3)), CwbClient::Composer);
    assert_eq!(rc.status_of(CwbClient::Composer), Some(CwbStatus::NotChecked));
    let f = fence();
    let (status, out) = rc.fence_for_client(CwbClient::Composer, Some(3), Some(f.clone()));
    assert_eq!(status, CwbStatus::NotChecked);
    assert!(out.unwrap().same(&f));
    assert_eq!(rc.status_of(CwbClient::Composer), None);
}

#[test]
fn register_drops_stale_response() {
    let rc = coordinator();
    rc.register(4, CwbClient::Color);
    rc.notify_cwb_done(0, 4, None);
    assert_eq!(rc.status_of(CwbClient::Color), Some(CwbStatus::Signaled));
    rc.register(7, CwbClient::Color);
    assert_eq!(rc.status_of(CwbClient::Color), Some(CwbStatus::Signaled));
    rc.register(4, CwbClient::Color);
    assert_eq!(rc.status_of(CwbClient::Color), None);
}

#[test]
fn frame_output_client() {
    let rc = coordinator();
    assert_eq!(rc.frame_output_client(None), CwbClient::None);
    rc.register(6, CwbClient::FrameDump);
    assert_eq!(rc.frame_output_client(Some(6)), CwbClient::FrameDump);
    rc.notify_cwb_done(0, 6, None);
    assert_eq!(rc.frame_output_client(Some(6)), CwbClient::FrameDump);
    assert_eq!(rc.frame_output_client(None), CwbClient::FrameDump);
    assert_eq!(rc.frame_output_client(Some(8)), CwbClient::None);
}

#[test]
fn wait_for_notification() {
    let rc = coordinator();
    rc.register(11, CwbClient::FrameDump);
    rc.frame_output_client(Some(11));
    let notifier = {
        let rc = rc.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            rc.notify_cwb_done(0, 11, None);
        })
    };
    let res = rc.wait_for_completion(CwbClient::FrameDump, Duration::from_secs(5));
    notifier.join().unwrap();
    assert!(matches!(res, CwbWait::Done(CwbStatus::Signaled, None)));
    assert_eq!(rc.status_of(CwbClient::FrameDump), None);
}

#[test]
fn wait_times_out() {
    let rc = coordinator();
    assert!(matches!(
        rc.wait_for_completion(CwbClient::FrameDump, Duration::from_millis(1)),
        CwbWait::Absent,
    ));
    rc.register(12, CwbClient::FrameDump);
    rc.frame_output_client(Some(12));
    let res = rc.wait_for_completion(CwbClient::FrameDump, Duration::from_millis(10));
    assert!(matches!(res, CwbWait::NotNotified));
    assert_eq!(rc.status_of(CwbClient::FrameDump), Some(CwbStatus::NotChecked));
    rc.notify_cwb_done(-c::ETIME, 12, None);
    let res = rc.wait_for_completion(CwbClient::FrameDump, Duration::from_millis(10));
    assert!(matches!(res, CwbWait::Done(CwbStatus::TimedOut, _)));
}

struct Handler {
    handled: AtomicBool,
    calls: Mutex<Vec<(i32, u64)>>,
}

impl CwbEventHandler for Handler {
    fn notify_cwb_done(&self, _display: DisplayId, status: i32, handle_id: u64) -> bool {
        self.calls.lock().push((status, handle_id));
        self.handled.load(Relaxed)
    }
}

#[test]
fn external_clients() {
    let handler = Arc::new(Handler {
        handled: AtomicBool::new(false),
        calls: Default::default(),
    });
    let rc = ReadbackCoordinator::new(DisplayId::from_raw(2), Some(handler.clone()));
    rc.register(20, CwbClient::External);
    rc.notify_cwb_done(0, 20, Some(fence()));
    assert_eq!(rc.status_of(CwbClient::External), Some(CwbStatus::Signaled));
    handler.handled.store(true, Relaxed);
    rc.register(21, CwbClient::External);
    rc.notify_cwb_done(0, 21, None);
    assert_eq!(rc.status_of(CwbClient::External), None);
    assert_eq!(*handler.calls.lock(), [(0, 20), (0, 21)]);
}
