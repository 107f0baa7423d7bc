use crate::{error::HwcError, layer::LayerId, layer_set::LayerSet};

fn ids(set: &LayerSet) -> Vec<u64> {
    set.sorted().iter().map(|l| l.id.raw()).collect()
}

#[test]
fn z_order() {
    let set = LayerSet::new(false);
    let a = set.create();
    let b = set.create();
    let c = set.create();
    set.set_z_order(a.id, 3).unwrap();
    set.set_z_order(b.id, 1).unwrap();
    set.set_z_order(c.id, 2).unwrap();
    assert_eq!(ids(&set), [b.id.raw(), c.id.raw(), a.id.raw()]);
    set.set_z_order(b.id, 5).unwrap();
    assert_eq!(ids(&set), [c.id.raw(), a.id.raw(), b.id.raw()]);
    assert_eq!(set.sorted().len(), 3);
}

#[test]
fn destroy() {
    let set = LayerSet::new(false);
    let a = set.create();
    let b = set.create();
    set.set_z_order(a.id, 4).unwrap();
    set.destroy(a.id).unwrap();
    assert_eq!(ids(&set), [b.id.raw()]);
    assert_eq!(set.destroy(a.id).err(), Some(HwcError::BadLayer));
    assert_eq!(set.get(a.id).err(), Some(HwcError::BadLayer));
    assert_eq!(
        set.set_z_order(LayerId::from_raw(99), 1),
        Err(HwcError::BadLayer),
    );
    set.destroy(b.id).unwrap();
    assert!(set.is_empty());
}

#[test]
fn ids_are_not_reused() {
    let set = LayerSet::new(false);
    let a = set.create();
    set.destroy(a.id).unwrap();
    let b = set.create();
    assert_ne!(a.id, b.id);
    let target = set.create_detached();
    assert_ne!(target.id, b.id);
    assert_eq!(set.len(), 1);
}
