//! Pattern registry: pattern key -> listeners.

use crate::listener::Listener;
use crate::pattern::{Match, Pattern};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide registration counter.
///
/// Shared by every emitter so equal-priority ties between composed emitters
/// still resolve in registration order.
static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// A listener registered under a pattern.
///
/// Each entry keeps the pattern it was registered with. Keys can collide
/// across patterns that match differently (a literal `"/ping/"` and the regex
/// `ping`, or regexes built with flags the key cannot see), so matching is
/// done per entry rather than per slot.
pub(crate) struct Entry<A> {
    pub(crate) pattern: Pattern,
    pub(crate) priority: i32,
    pub(crate) sequence: u64,
    pub(crate) listener: Listener<A>,
}

impl<A> Clone for Entry<A> {
    fn clone(&self) -> Self {
        Self {
            pattern: self.pattern.clone(),
            priority: self.priority,
            sequence: self.sequence,
            listener: self.listener.clone(),
        }
    }
}

struct Slot<A> {
    /// Pattern the slot was created with, reported by `matches` once every
    /// listener has been unbound
    pattern: Pattern,
    listeners: Vec<Entry<A>>,
}

impl<A> Slot<A> {
    /// First pattern in the slot that matches `event`.
    fn matches(&self, event: &str) -> Option<Match> {
        self.listeners
            .iter()
            .map(|entry| &entry.pattern)
            .chain(std::iter::once(&self.pattern))
            .find_map(|pattern| pattern.matches(event))
    }
}

pub(crate) struct Registry<A> {
    slots: HashMap<String, Slot<A>>,
}

impl<A> Default for Registry<A> {
    fn default() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }
}

impl<A> Registry<A> {
    /// Append `listener` under `pattern`, creating the slot if needed.
    pub(crate) fn insert(&mut self, pattern: Pattern, listener: Listener<A>, priority: i32) {
        let sequence = NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        self.slots
            .entry(pattern.key().to_string())
            .or_insert_with(|| Slot {
                pattern: pattern.clone(),
                listeners: Vec::new(),
            })
            .listeners
            .push(Entry {
                pattern,
                priority,
                sequence,
                listener,
            });
    }

    /// Remove the first entry under `key` whose listener is `listener`.
    ///
    /// An emptied slot stays registered, like it would after registering
    /// nothing; `clear` is what drops slots.
    pub(crate) fn remove(&mut self, key: &str, listener: &Listener<A>) -> bool {
        let Some(slot) = self.slots.get_mut(key) else {
            return false;
        };
        match slot
            .listeners
            .iter()
            .position(|entry| entry.listener.ptr_eq(listener))
        {
            Some(index) => {
                slot.listeners.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn clear(&mut self, key: &str) -> bool {
        self.slots.remove(key).is_some()
    }

    pub(crate) fn clear_all(&mut self) {
        self.slots.clear();
    }

    /// Every pattern matching `event`, keyed by pattern key.
    pub(crate) fn matches(&self, event: &str) -> HashMap<String, Match> {
        self.slots
            .iter()
            .filter_map(|(key, slot)| Some((key.clone(), slot.matches(event)?)))
            .collect()
    }

    /// Every listener entry whose pattern matches `event`, with its match.
    pub(crate) fn matching_entries(&self, event: &str) -> Vec<(Match, Entry<A>)> {
        self.slots
            .values()
            .flat_map(|slot| slot.listeners.iter())
            .filter_map(|entry| Some((entry.pattern.matches(event)?, entry.clone())))
            .collect()
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.slots.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub(crate) fn listener_count(&self, key: &str) -> usize {
        self.slots.get(key).map_or(0, |slot| slot.listeners.len())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
