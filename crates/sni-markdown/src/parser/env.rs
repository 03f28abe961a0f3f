//! Per-call scratch state shared by the rules of one tokenize call.

use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Call-scoped environment.
///
/// Holds one typed slot per extension (for example the inline footnote
/// bodies). A fresh `Env` is created for every tokenize call, so nothing
/// leaks between documents.
#[derive(Default)]
pub struct Env {
    slots: HashMap<TypeId, Box<dyn Any + Send>>,
}

impl Env {
    /// Create an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Extension slot of type `T`, if one was created.
    pub fn get<T: Any + Send>(&self) -> Option<&T> {
        self.slots
            .get(&TypeId::of::<T>())
            .and_then(|slot| slot.downcast_ref::<T>())
    }

    /// Mutable extension slot of type `T`, if one was created.
    pub fn get_mut<T: Any + Send>(&mut self) -> Option<&mut T> {
        self.slots
            .get_mut(&TypeId::of::<T>())
            .and_then(|slot| slot.downcast_mut::<T>())
    }

    /// Mutable extension slot of type `T`, created on first use.
    pub fn get_or_default<T: Any + Send + Default>(&mut self) -> &mut T {
        let slot = self
            .slots
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::default()));
        let Some(value) = slot.downcast_mut::<T>() else {
            unreachable!("env slots are keyed by the TypeId of their value")
        };
        value
    }

    /// Remove and return the slot of type `T`.
    pub fn take<T: Any + Send>(&mut self) -> Option<T> {
        self.slots
            .remove(&TypeId::of::<T>())
            .and_then(|slot| slot.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Debug, PartialEq)]
    struct Counter(usize);

    #[test]
    fn test_slot_created_on_first_use() {
        let mut env = Env::new();
        assert!(env.get::<Counter>().is_none());
        env.get_or_default::<Counter>().0 += 2;
        env.get_or_default::<Counter>().0 += 1;
        assert_eq!(env.get::<Counter>(), Some(&Counter(3)));
    }

    #[test]
    fn test_take_removes_slot() {
        let mut env = Env::new();
        env.get_or_default::<Counter>().0 = 7;
        assert_eq!(env.take::<Counter>(), Some(Counter(7)));
        assert!(env.get_mut::<Counter>().is_none());
    }
}
