use {
    crate::{
        error::HwcError,
        layer::{HwcLayer, LayerId, LayerIds},
        utils::copyhashmap::CopyHashMap,
    },
    std::{cell::RefCell, collections::BTreeSet, rc::Rc},
};

#[cfg(test)]
mod tests;

/// The layers of a display.
///
/// Layers are owned by the id map. The z index only stores ids.
pub struct LayerSet {
    ids: LayerIds,
    disable_sdr_dimming: bool,
    layers: CopyHashMap<LayerId, Rc<HwcLayer>>,
    z_index: RefCell<BTreeSet<(u32, LayerId)>>,
}

impl LayerSet {
    pub fn new(disable_sdr_dimming: bool) -> Self {
        Self {
            ids: Default::default(),
            disable_sdr_dimming,
            layers: Default::default(),
            z_index: Default::default(),
        }
    }

    /// Allocates a layer that is not part of the set.
    pub fn create_detached(&self) -> HwcLayer {
        HwcLayer::new(self.ids.next(), self.disable_sdr_dimming)
    }

    pub fn create(&self) -> Rc<HwcLayer> {
        let layer = Rc::new(self.create_detached());
        self.z_index.borrow_mut().insert((layer.z(), layer.id));
        self.layers.set(layer.id, layer.clone());
        layer
    }

    pub fn destroy(&self, id: LayerId) -> Result<Rc<HwcLayer>, HwcError> {
        let Some(layer) = self.layers.remove(&id) else {
            return Err(HwcError::BadLayer);
        };
        self.z_index.borrow_mut().remove(&(layer.z(), id));
        Ok(layer)
    }

    pub fn get(&self, id: LayerId) -> Result<Rc<HwcLayer>, HwcError> {
        self.layers.get(&id).ok_or(HwcError::BadLayer)
    }

    pub fn set_z_order(&self, id: LayerId, z: u32) -> Result<(), HwcError> {
        let layer = self.get(id)?;
        let old = layer.z();
        if layer.set_z_order(z) {
            let mut index = self.z_index.borrow_mut();
            index.remove(&(old, id));
            index.insert((z, id));
        }
        Ok(())
    }

    /// The layers sorted by z. Equal z values are ordered by creation.
    pub fn sorted(&self) -> Vec<Rc<HwcLayer>> {
        let index = self.z_index.borrow();
        let mut res = Vec::with_capacity(index.len());
        for (_, id) in index.iter() {
            if let Some(layer) = self.layers.get(id) {
                res.push(layer);
            }
        }
        res
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
