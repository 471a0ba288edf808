//! The identity map.
//!
//! Guarantees at most one live in-memory instance per persisted identity.
//! Entries are weak, so object lifetime is governed by the callers' strong
//! handles; `collect_unreferenced` sweeps entries whose last strong holder
//! has dropped.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::object::{BusinessObject, SharedObject};

/// Weak identity map keyed by object-id string.
#[derive(Debug, Default)]
pub struct ObjectManager {
    objects: RefCell<HashMap<String, Weak<RefCell<BusinessObject>>>>,
}

impl ObjectManager {
    /// Create an empty identity map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the instance for `object_id`.
    pub fn add(&self, object_id: &str, object: &SharedObject) {
        self.objects
            .borrow_mut()
            .insert(object_id.to_string(), Rc::downgrade(object));
    }

    /// The live instance for `object_id`, if any strong holder remains.
    #[must_use]
    pub fn get(&self, object_id: &str) -> Option<SharedObject> {
        self.objects
            .borrow()
            .get(object_id)
            .and_then(Weak::upgrade)
    }

    /// Whether a live instance exists for `object_id`.
    #[must_use]
    pub fn contains(&self, object_id: &str) -> bool {
        self.get(object_id).is_some()
    }

    /// Remove the entry for `object_id`. Removing an absent entry is a
    /// no-op.
    pub fn remove(&self, object_id: &str) {
        self.objects.borrow_mut().remove(object_id);
    }

    /// Sweep entries whose object has been dropped. Returns how many were
    /// collected.
    pub fn collect_unreferenced(&self) -> usize {
        let mut objects = self.objects.borrow_mut();
        let before = objects.len();
        objects.retain(|_, weak| weak.upgrade().is_some());
        before - objects.len()
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects
            .borrow()
            .values()
            .filter(|weak| weak.upgrade().is_some())
            .count()
    }

    /// Whether no live entries remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. Intended for test isolation.
    pub fn reset(&self) {
        self.objects.borrow_mut().clear();
    }
}
