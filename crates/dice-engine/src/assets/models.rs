use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::geometry::DieModel;
use crate::api::types::DieKind;

/// Read-through cache of die models keyed by side count.
///
/// Models are built on first use and never mutated afterwards.
pub struct ModelCache {
    models: HashMap<u32, Arc<DieModel>>,
    reported: HashSet<u32>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self {
            models: HashMap::new(),
            reported: HashSet::new(),
        }
    }

    /// Look up or build the model for `sides`.
    ///
    /// Side counts that cannot be built get a plain cube without a face
    /// table; the fault is logged once per side count.
    pub fn get_or_build(&mut self, sides: u32) -> Arc<DieModel> {
        if let Some(model) = self.models.get(&sides) {
            return Arc::clone(model);
        }
        let model = match DieModel::build(sides) {
            Ok(model) => model,
            Err(err) => {
                if self.reported.insert(sides) {
                    log::warn!("{err}; using a plain cube");
                }
                DieModel::fallback_cube(sides)
            }
        };
        let model = Arc::new(model);
        self.models.insert(sides, Arc::clone(&model));
        model
    }

    /// Look up a model without building it.
    pub fn get(&self, sides: u32) -> Option<Arc<DieModel>> {
        self.models.get(&sides).cloned()
    }

    /// Build every supported model up front.
    pub fn preload(&mut self) {
        for kind in DieKind::ALL {
            self.get_or_build(kind.sides());
        }
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl Default for ModelCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_once_and_shares() {
        let mut cache = ModelCache::new();
        let a = cache.get_or_build(20);
        let b = cache.get_or_build(20);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn unknown_sides_fall_back_to_cube() {
        let mut cache = ModelCache::new();
        let model = cache.get_or_build(7);
        assert_eq!(model.kind(), None);
        assert!(model.face(1).is_none());
        assert_eq!(model.sides(), 7);
        // Second lookup is served from the cache.
        assert!(Arc::ptr_eq(&model, &cache.get_or_build(7)));
    }

    #[test]
    fn preload_fills_every_kind() {
        let mut cache = ModelCache::new();
        assert!(cache.is_empty());
        cache.preload();
        assert_eq!(cache.len(), DieKind::ALL.len());
        assert!(cache.get(100).is_some());
        assert!(cache.get(3).is_none());
    }
}
