// src/deps/arena.rs

//! Generational slot arena backing variable and operator handles.
//!
//! Handles are `(index, generation)` pairs. Releasing a slot bumps its
//! generation, so a handle issued before the release no longer resolves even
//! after the index is reused.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::errors::{EngineError, Result};

/// Raw arena key shared by [`VarHandle`](crate::VarHandle) and
/// [`OprHandle`](crate::OprHandle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key {
    pub index: u32,
    pub generation: u32,
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<Arc<T>>,
}

struct Slots<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

/// Lookups take the table lock shared; only insert/remove take it exclusively.
pub struct Arena<T> {
    name: &'static str,
    inner: RwLock<Slots<T>>,
}

impl<T> Arena<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: RwLock::new(Slots {
                slots: Vec::new(),
                free: Vec::new(),
                live: 0,
            }),
        }
    }

    /// Allocate a slot and build its value from the key it will live under.
    pub fn insert_with(&self, build: impl FnOnce(Key) -> T) -> Result<(Key, Arc<T>)> {
        let mut inner = self.inner.write();

        let index = match inner.free.pop() {
            Some(index) => index,
            None => {
                let index = u32::try_from(inner.slots.len())
                    .map_err(|_| EngineError::Exhausted(self.name))?;
                inner.slots.push(Slot {
                    generation: 0,
                    value: None,
                });
                index
            }
        };

        let slot = &mut inner.slots[index as usize];
        let key = Key {
            index,
            generation: slot.generation,
        };
        let value = Arc::new(build(key));
        slot.value = Some(Arc::clone(&value));
        inner.live += 1;

        Ok((key, value))
    }

    /// Resolve a key, or `None` if the slot was released since it was issued.
    pub fn get(&self, key: Key) -> Option<Arc<T>> {
        let inner = self.inner.read();
        let slot = inner.slots.get(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.value.clone()
    }

    /// Release the slot behind `key`. Outstanding `Arc`s keep the value alive,
    /// but the key (and every copy of it) stops resolving.
    pub fn remove(&self, key: Key) -> Option<Arc<T>> {
        let mut inner = self.inner.write();
        let slot = inner.slots.get_mut(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        inner.free.push(key.index);
        inner.live -= 1;
        Some(value)
    }

    /// Number of live slots.
    pub fn len(&self) -> usize {
        self.inner.read().live
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> fmt::Debug for Arena<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("name", &self.name)
            .field("live", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_keys_stop_resolving_after_reuse() {
        let arena: Arena<&'static str> = Arena::new("test");
        let (a, _) = arena.insert_with(|_| "a").unwrap();
        assert!(arena.remove(a).is_some());

        let (b, _) = arena.insert_with(|_| "b").unwrap();
        assert_eq!(a.index, b.index, "slot should be reused");
        assert_ne!(a.generation, b.generation);

        assert!(arena.get(a).is_none());
        assert_eq!(arena.get(b).as_deref(), Some(&"b"));
        assert!(arena.remove(a).is_none(), "stale remove must not free the new value");
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn build_sees_its_own_key() {
        let arena: Arena<Key> = Arena::new("test");
        let (key, value) = arena.insert_with(|k| k).unwrap();
        assert_eq!(*value, key);
    }
}
