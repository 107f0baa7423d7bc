//! The change and request bookkeeping of the validate/commit protocol.

use {
    crate::{
        error::HwcError,
        flags::{
            DR_FLIP_CLIENT_TARGET, DisplayRequests, LF_SKIP, LR_FLIP_BUFFER,
            LRF_CLEAR_CLIENT_TARGET, LayerRequestFlags,
        },
        layer::{Composition, EngineComposition, HwcLayer, LayerId},
        layer_set::LayerSet,
        stack::LayerStackSnapshot,
    },
    std::{
        cell::{Cell, RefCell},
        collections::BTreeMap,
        rc::Rc,
    },
};

#[cfg(test)]
mod tests;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum ValidateOutcome {
    #[default]
    NoChanges,
    /// The client has to fetch the changed composition types and accept them.
    HasChanges,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub struct ValidateResult {
    pub outcome: ValidateOutcome,
    pub num_types: u32,
    pub num_requests: u32,
}

#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub struct DisplayRequestList {
    pub display: DisplayRequests,
    pub layers: Vec<(LayerId, LayerRequestFlags)>,
}

#[derive(Default)]
pub struct Validation {
    changes: RefCell<BTreeMap<LayerId, Composition>>,
    requests: RefCell<BTreeMap<LayerId, LayerRequestFlags>>,
    pub validate_done: Cell<bool>,
    pub has_client_composition: Cell<bool>,
    pub stack_invalid: Cell<bool>,
}

impl Validation {
    pub fn begin(&self) {
        self.changes.borrow_mut().clear();
        self.requests.borrow_mut().clear();
        self.has_client_composition.set(false);
    }

    /// Short-circuits a prepare if the engine still holds a validated stack in
    /// which every layer was skipped and composed by the client.
    pub fn try_skip_prepare(
        &self,
        engine_validated: bool,
        has_demura: bool,
        layers: &[Rc<HwcLayer>],
    ) -> Option<ValidateResult> {
        if !engine_validated || layers.is_empty() || has_demura {
            return None;
        }
        let mut changes = self.changes.borrow_mut();
        for layer in layers {
            if !layer.frame_flags().contains(LF_SKIP)
                || layer.device_selected() != Composition::Client
            {
                changes.clear();
                return None;
            }
            if layer.client_requested() != Composition::Client {
                changes.insert(layer.id, Composition::Client);
            }
        }
        self.requests.borrow_mut().clear();
        self.stack_invalid.set(false);
        self.validate_done.set(true);
        self.has_client_composition.set(true);
        let num_types = changes.len() as u32;
        log::debug!("Skipping prepare with {} changes", num_types);
        Some(ValidateResult {
            outcome: match num_types {
                0 => ValidateOutcome::NoChanges,
                _ => ValidateOutcome::HasChanges,
            },
            num_types,
            num_requests: 0,
        })
    }

    /// Records the engine's decisions after a successful prepare.
    pub fn finalize(
        &self,
        layers: &LayerSet,
        client_target: &HwcLayer,
        stack: &mut LayerStackSnapshot,
    ) -> ValidateResult {
        let mut changes = self.changes.borrow_mut();
        let mut requests = self.requests.borrow_mut();
        changes.clear();
        requests.clear();
        let mut has_client = false;
        for sl in stack.app_layers() {
            let Ok(layer) = layers.get(sl.id) else {
                continue;
            };
            if matches!(sl.composition, EngineComposition::Sde | EngineComposition::Stitch) {
                requests.insert(layer.id, LRF_CLEAR_CLIENT_TARGET);
            }
            let requested = layer.client_requested();
            let device = layer.set_engine_composition(sl.composition);
            if device == Composition::Client {
                has_client = true;
            }
            if requested != device {
                changes.insert(layer.id, device);
            }
            layer.reset_validation();
        }
        client_target.reset_validation();
        self.has_client_composition.set(has_client);
        self.stack_invalid.set(false);
        self.validate_done.set(true);
        stack.client_incompatible = false;
        let num_types = changes.len() as u32;
        let num_requests = requests.len() as u32;
        let outcome = if num_types > 0 || (has_client && num_requests > 0) {
            ValidateOutcome::HasChanges
        } else {
            ValidateOutcome::NoChanges
        };
        ValidateResult {
            outcome,
            num_types,
            num_requests,
        }
    }

    pub fn accept_changes(&self, layers: &LayerSet) -> Result<(), HwcError> {
        if layers.is_empty() {
            return Ok(());
        }
        if !self.validate_done.get() {
            return Err(HwcError::NotValidated);
        }
        let changes = std::mem::take(&mut *self.changes.borrow_mut());
        for (id, composition) in changes {
            match layers.get(id) {
                Ok(layer) => layer.update_client_composition(composition),
                Err(_) => log::warn!("Invalid layer {}", id),
            }
        }
        Ok(())
    }

    pub fn changed_composition_types(
        &self,
        layers: &LayerSet,
    ) -> Result<Vec<(LayerId, Composition)>, HwcError> {
        if layers.is_empty() {
            return Ok(vec![]);
        }
        if !self.validate_done.get() {
            log::warn!("Display is not validated");
            return Err(HwcError::NotValidated);
        }
        Ok(self.changes.borrow().iter().map(|(k, v)| (*k, *v)).collect())
    }

    pub fn display_requests(
        &self,
        layers: &LayerSet,
        stack: &LayerStackSnapshot,
    ) -> Result<DisplayRequestList, HwcError> {
        let mut res = DisplayRequestList::default();
        if layers.is_empty() {
            return Ok(res);
        }
        if !self.validate_done.get() {
            log::warn!("Display is not validated");
            return Err(HwcError::NotValidated);
        }
        res.layers = self.requests.borrow().iter().map(|(k, v)| (*k, *v)).collect();
        if let Some(ct) = stack.client_target()
            && ct.requests.contains(LR_FLIP_BUFFER)
        {
            res.display |= DR_FLIP_CLIENT_TARGET;
        }
        Ok(res)
    }

    pub fn num_changes(&self) -> usize {
        self.changes.borrow().len()
    }
}
