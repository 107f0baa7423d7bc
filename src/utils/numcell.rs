use std::{cell::Cell, ops::Add};

#[derive(Default)]
pub struct NumCell<T> {
    t: Cell<T>,
}

impl<T: Copy> NumCell<T> {
    #[inline(always)]
    pub const fn new(t: T) -> Self {
        Self { t: Cell::new(t) }
    }

    #[inline(always)]
    pub fn get(&self) -> T {
        self.t.get()
    }

    #[inline(always)]
    pub fn set(&self, n: T) {
        self.t.set(n);
    }

    #[inline(always)]
    pub fn fetch_add(&self, n: T) -> T
    where
        T: Add<T, Output = T>,
    {
        let res = self.t.get();
        self.t.set(res + n);
        res
    }
}
