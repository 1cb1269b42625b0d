//! Clone-aware, shadow-aware storage for a single narrative object.
//!
//! A [`CloneableObject`] maps clone ids to [`ShadowableObject`]s. Each
//! shadowable keeps the authoritative instance at level 0 plus lazily made
//! duplicates for deeper shadow levels, removed again when their level is
//! popped.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use crate::id::{CloneId, NEXT_FREE_CLONE};
use crate::object::Duplicate;
use crate::shadow::ShadowStateManager;

/// A shared, mutable handle to one object instance. Identity is the `Rc`.
pub type Shared<T> = Rc<RefCell<T>>;

#[derive(Debug)]
struct ShadowCopy<T> {
    level: u32,
    object: Shared<T>,
}

type ShadowCopies<T> = Rc<RefCell<Vec<ShadowCopy<T>>>>;

/// The per-clone stack of shadow copies.
#[derive(Debug)]
pub struct ShadowableObject<T> {
    copies: ShadowCopies<T>,
}

impl<T: Duplicate + 'static> ShadowableObject<T> {
    /// Seed level 0 with `object`.
    pub fn new(object: T) -> Self {
        Self {
            copies: Rc::new(RefCell::new(vec![ShadowCopy {
                level: 0,
                object: Rc::new(RefCell::new(object)),
            }])),
        }
    }

    /// The instance for the manager's current level, or level 0 when forced.
    ///
    /// A missing level is created by duplicating the topmost copy. The new
    /// copy is removed when its level is popped.
    pub fn get(&self, manager: &dyn ShadowStateManager, force_unshadowed: bool) -> Option<Shared<T>> {
        if force_unshadowed {
            return self.copies.borrow().first().map(|c| Rc::clone(&c.object));
        }

        let level = manager.shadow_level();
        let duplicate = {
            let copies = self.copies.borrow();
            if let Some(existing) = copies.iter().find(|c| c.level == level) {
                return Some(Rc::clone(&existing.object));
            }
            let top = copies.last()?;
            if level == 0 {
                tracing::error!("shadow stack lost its level 0 copy");
                return Some(Rc::clone(&top.object));
            }
            let copy = top.object.borrow().duplicate();
            copy
        };

        let object = Rc::new(RefCell::new(duplicate));
        self.copies.borrow_mut().push(ShadowCopy {
            level,
            object: Rc::clone(&object),
        });

        let copies: Weak<RefCell<Vec<ShadowCopy<T>>>> = Rc::downgrade(&self.copies);
        manager.register_on_pop_state(Box::new(move || {
            // The entry may have been unloaded while the level was open.
            let Some(copies) = copies.upgrade() else {
                return;
            };
            let mut copies = copies.borrow_mut();
            match copies.last() {
                Some(top) if top.level == level => {
                    copies.pop();
                }
                _ => tracing::error!(level, "shadow copy popped out of order"),
            }
        }));

        Some(object)
    }

    /// Levels currently present, ascending.
    pub fn levels(&self) -> Vec<u32> {
        self.copies.borrow().iter().map(|c| c.level).collect()
    }
}

/// All clones of one canonical object.
#[derive(Debug)]
pub struct CloneableObject<T> {
    clones: RefCell<BTreeMap<CloneId, ShadowableObject<T>>>,
}

impl<T: Duplicate + 'static> CloneableObject<T> {
    /// Seed clone 0 with `object`.
    pub fn init(mut object: T) -> Self {
        object.set_clone_id(0);
        let mut clones = BTreeMap::new();
        clones.insert(0, ShadowableObject::new(object));
        Self {
            clones: RefCell::new(clones),
        }
    }

    /// The instance of `clone_id` at the manager's current level.
    pub fn get(
        &self,
        manager: &dyn ShadowStateManager,
        clone_id: CloneId,
        force_unshadowed: bool,
    ) -> Option<Shared<T>> {
        self.clones
            .borrow()
            .get(&clone_id)
            .and_then(|shadowable| shadowable.get(manager, force_unshadowed))
    }

    /// Create clone `new_clone_id` from the canonical level-0 instance.
    ///
    /// An existing clone is returned as-is, or `None` when `fail_if_exists`.
    /// [`NEXT_FREE_CLONE`] picks the lowest unused id.
    pub fn clone_object(
        &self,
        manager: &dyn ShadowStateManager,
        new_clone_id: CloneId,
        fail_if_exists: bool,
    ) -> Option<Shared<T>> {
        let clone_id = if new_clone_id == NEXT_FREE_CLONE {
            self.next_free_clone_id()
        } else {
            if let Some(existing) = self.get(manager, new_clone_id, false) {
                return if fail_if_exists { None } else { Some(existing) };
            }
            new_clone_id
        };

        let canonical = self.get(manager, 0, true)?;
        let mut copy = canonical.borrow().duplicate();
        copy.set_clone_id(clone_id);

        let shadowable = ShadowableObject::new(copy);
        let object = shadowable.get(manager, true);
        self.clones.borrow_mut().insert(clone_id, shadowable);
        tracing::debug!(clone_id, "created clone");
        object
    }

    /// Clone ids present, ascending.
    pub fn clone_ids(&self) -> Vec<CloneId> {
        self.clones.borrow().keys().copied().collect()
    }

    /// Whether `clone_id` exists.
    pub fn has_clone(&self, clone_id: CloneId) -> bool {
        self.clones.borrow().contains_key(&clone_id)
    }

    /// Shadow levels present for `clone_id`.
    pub fn shadow_levels(&self, clone_id: CloneId) -> Vec<u32> {
        self.clones
            .borrow()
            .get(&clone_id)
            .map(ShadowableObject::levels)
            .unwrap_or_default()
    }

    fn next_free_clone_id(&self) -> CloneId {
        let clones = self.clones.borrow();
        (0..).find(|id| !clones.contains_key(id)).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shadow::ShadowState;

    #[derive(Debug, Clone, PartialEq)]
    struct Counter {
        clone_id: CloneId,
        value: i32,
    }

    impl Duplicate for Counter {
        fn duplicate(&self) -> Self {
            self.clone()
        }

        fn set_clone_id(&mut self, clone_id: CloneId) {
            self.clone_id = clone_id;
        }
    }

    fn entry() -> CloneableObject<Counter> {
        CloneableObject::init(Counter {
            clone_id: 0,
            value: 1,
        })
    }

    #[test]
    fn get_is_idempotent_per_level() {
        let state = ShadowState::new();
        let entry = entry();
        let a = entry.get(&state, 0, false).unwrap();
        let b = entry.get(&state, 0, false).unwrap();
        assert!(Rc::ptr_eq(&a, &b));

        state.push_state();
        let c = entry.get(&state, 0, false).unwrap();
        let d = entry.get(&state, 0, false).unwrap();
        assert!(Rc::ptr_eq(&c, &d));
        assert!(!Rc::ptr_eq(&a, &c));
        state.pop_state();
    }

    #[test]
    fn shadow_is_discarded_on_pop() {
        let state = ShadowState::new();
        let entry = entry();
        let before = entry.get(&state, 0, false).unwrap();

        state.push_state();
        entry.get(&state, 0, false).unwrap().borrow_mut().value = 99;
        assert_eq!(entry.shadow_levels(0), vec![0, 1]);
        state.pop_state();

        let after = entry.get(&state, 0, false).unwrap();
        assert!(Rc::ptr_eq(&before, &after));
        assert_eq!(after.borrow().value, 1);
        assert_eq!(entry.shadow_levels(0), vec![0]);
    }

    #[test]
    fn deeper_level_copies_top_of_stack() {
        let state = ShadowState::new();
        let entry = entry();
        state.push_state();
        entry.get(&state, 0, false).unwrap().borrow_mut().value = 5;
        state.push_state();
        state.push_state();
        let deep = entry.get(&state, 0, false).unwrap();
        assert_eq!(deep.borrow().value, 5);
        assert_eq!(entry.shadow_levels(0), vec![0, 1, 3]);
        state.pop_state();
        assert_eq!(entry.shadow_levels(0), vec![0, 1]);
        state.pop_state();
        state.pop_state();
        assert_eq!(entry.shadow_levels(0), vec![0]);
    }

    #[test]
    fn force_unshadowed_returns_level_zero() {
        let state = ShadowState::new();
        let entry = entry();
        let base = entry.get(&state, 0, false).unwrap();
        state.push_state();
        state.push_state();
        let shadow = entry.get(&state, 0, false).unwrap();
        let forced = entry.get(&state, 0, true).unwrap();
        assert!(Rc::ptr_eq(&base, &forced));
        assert!(!Rc::ptr_eq(&shadow, &forced));
        state.pop_state();
        state.pop_state();
    }

    #[test]
    fn clone_allocates_next_free_id() {
        let state = ShadowState::new();
        let entry = entry();
        entry.clone_object(&state, 1, true).unwrap();
        entry.clone_object(&state, 2, true).unwrap();
        let third = entry.clone_object(&state, NEXT_FREE_CLONE, true).unwrap();
        assert_eq!(third.borrow().clone_id, 3);
        assert_eq!(entry.clone_ids(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn clone_existing_respects_fail_flag() {
        let state = ShadowState::new();
        let entry = entry();
        let first = entry.clone_object(&state, 1, true).unwrap();
        assert!(entry.clone_object(&state, 1, true).is_none());
        let again = entry.clone_object(&state, 1, false).unwrap();
        assert!(Rc::ptr_eq(&first, &again));
    }

    #[test]
    fn clones_are_isolated() {
        let state = ShadowState::new();
        let entry = entry();
        let one = entry.clone_object(&state, 1, true).unwrap();
        one.borrow_mut().value = 42;
        assert_eq!(entry.get(&state, 0, false).unwrap().borrow().value, 1);
        assert_eq!(entry.get(&state, 1, false).unwrap().borrow().value, 42);
    }

    #[test]
    fn missing_clone_is_none() {
        let state = ShadowState::new();
        assert!(entry().get(&state, 7, false).is_none());
    }

    #[test]
    fn dropped_entry_ignores_pending_pop() {
        let state = ShadowState::new();
        state.push_state();
        {
            let entry = entry();
            entry.get(&state, 0, false).unwrap();
        }
        state.pop_state();
        assert_eq!(state.shadow_level(), 0);
    }
}
