use {
    ahash::AHashMap,
    std::{
        cell::{RefCell, RefMut},
        hash::Hash,
    },
};

/// A hash map behind a `RefCell` whose values are cloned out on access.
///
/// Borrows never escape a single method call except through `lock`.
pub struct CopyHashMap<K, V> {
    map: RefCell<AHashMap<K, V>>,
}

impl<K, V> Default for CopyHashMap<K, V> {
    fn default() -> Self {
        Self {
            map: Default::default(),
        }
    }
}

impl<K: Eq + Hash + Copy, V: Clone> CopyHashMap<K, V> {
    pub fn set(&self, k: K, v: V) {
        self.map.borrow_mut().insert(k, v);
    }

    pub fn get(&self, k: &K) -> Option<V> {
        self.map.borrow().get(k).cloned()
    }

    pub fn remove(&self, k: &K) -> Option<V> {
        self.map.borrow_mut().remove(k)
    }

    pub fn len(&self) -> usize {
        self.map.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.borrow().is_empty()
    }

    pub fn lock(&self) -> RefMut<'_, AHashMap<K, V>> {
        self.map.borrow_mut()
    }
}
