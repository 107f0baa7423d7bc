use {
    crate::{
        display::{DisplayDeps, DisplayId},
        error::HwcError,
        manager::{DEFAULT_THROTTLING_REFRESH_RATE, HwcManager},
        sim::{RecordingCallbacks, SimEngine},
    },
    std::rc::Rc,
};

fn deps(callbacks: &Rc<RecordingCallbacks>) -> DisplayDeps {
    DisplayDeps {
        engine: Rc::new(SimEngine::default()),
        callbacks: callbacks.clone(),
        tone_mapper: None,
        cwb_handler: None,
    }
}

#[test]
fn throttling_rate() {
    let manager = HwcManager::default();
    assert_eq!(
        manager.context().throttling_refresh_rate(),
        DEFAULT_THROTTLING_REFRESH_RATE,
    );
    manager.set_throttling_refresh_rate(24);
    assert_eq!(manager.context().throttling_refresh_rate(), 24);
}

#[test]
fn display_lifecycle() {
    let manager = HwcManager::default();
    let callbacks = Rc::new(RecordingCallbacks::default());
    let a = manager
        .create_display(Default::default(), deps(&callbacks))
        .unwrap();
    let b = manager
        .create_display(Default::default(), deps(&callbacks))
        .unwrap();
    assert_ne!(a.id, b.id);
    assert_eq!(manager.num_displays(), 2);
    assert!(Rc::ptr_eq(&manager.display(a.id).unwrap(), &a));
    manager.destroy_display(a.id).unwrap();
    assert_eq!(manager.display(a.id).err(), Some(HwcError::BadDisplay));
    assert_eq!(manager.destroy_display(a.id), Err(HwcError::BadDisplay));
    assert_eq!(
        manager.display(DisplayId::from_raw(100)).err(),
        Some(HwcError::BadDisplay),
    );
    assert_eq!(manager.num_displays(), 1);
}

#[test]
fn mmrm_refreshes_every_display() {
    let manager = HwcManager::default();
    let callbacks = Rc::new(RecordingCallbacks::default());
    for _ in 0..3 {
        manager
            .create_display(Default::default(), deps(&callbacks))
            .unwrap();
    }
    manager.mmrm_event(true);
    assert!(manager.context().mmrm_restricted());
    assert_eq!(callbacks.refreshes.get(), 3);
    manager.mmrm_event(false);
    assert!(!manager.context().mmrm_restricted());
    assert_eq!(callbacks.refreshes.get(), 6);
}
