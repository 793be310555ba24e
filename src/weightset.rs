//! The global weight-ordered multiset over all live rectangles.
//!
//! Keyed by `(weight, duration, start, entity name, id)` so the
//! lightest rectangle is always the minimum element; `id` is a final
//! tiebreaker that cannot collide, keeping the ordering total even in
//! the (unreachable in practice) case the first four fields coincide.
//!
//! A rectangle's key moves whenever its own duration/start change or a
//! neighbor's duration changes its weight; [`WeightSet::put`] models
//! both as remove-then-insert against a `BTreeSet`, which the design
//! notes call out as an acceptable rendering of "search forward"/
//! "search backward" re-key semantics, since `BTreeSet`'s own
//! rebalancing is `O(log n)` regardless of which direction the key
//! moved.

use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use crate::rect::RectId;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct RectKey {
    weight: u64,
    duration: u64,
    start: u64,
    entity_name: Rc<str>,
    id: RectId,
}

#[derive(Default)]
pub struct WeightSet {
    set: BTreeSet<RectKey>,
    current: HashMap<RectId, RectKey>,
}

impl WeightSet {
    /// Inserts `id` with a freshly computed key, replacing any key it
    /// previously held. Covers both first insertion and re-keying
    /// after a weight, duration, or start change.
    pub fn put(&mut self, id: RectId, weight: u64, duration: u64, start: u64, entity_name: Rc<str>) {
        self.remove(id);
        let key = RectKey {
            weight,
            duration,
            start,
            entity_name,
            id,
        };
        self.set.insert(key.clone());
        self.current.insert(id, key);
    }

    pub fn remove(&mut self, id: RectId) {
        if let Some(key) = self.current.remove(&id) {
            self.set.remove(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Rectangle ids in ascending weight order (ties broken by
    /// duration, start, entity name, then id).
    pub fn ascending(&self) -> impl Iterator<Item = RectId> + '_ {
        self.set.iter().map(|k| k.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> RectId {
        let mut entities = crate::entity::EntityTable::default();
        let entity = entities.lookup_or_insert("e");
        let mut slab = crate::rect::RectSlab::default();
        let mut last = None;
        for _ in 0..=n {
            last = Some(slab.alloc(crate::rect::Rectangle {
                start: 0,
                duration: 0,
                weight: 0,
                prev: None,
                next: None,
                entity,
                tags: vec![],
                states: vec![],
            }));
        }
        last.unwrap()
    }

    #[test]
    fn ascending_orders_by_weight_then_tiebreaks() {
        let mut ws = WeightSet::default();
        let a = id(0);
        let b = id(1);
        let name: Rc<str> = Rc::from("e");
        ws.put(a, 30, 10, 0, Rc::clone(&name));
        ws.put(b, 10, 5, 0, Rc::clone(&name));
        let order: Vec<RectId> = ws.ascending().collect();
        assert_eq!(order, vec![b, a]);
    }

    #[test]
    fn put_moves_element_to_new_position() {
        let mut ws = WeightSet::default();
        let a = id(0);
        let b = id(1);
        let name: Rc<str> = Rc::from("e");
        ws.put(a, 30, 10, 0, Rc::clone(&name));
        ws.put(b, 10, 5, 0, Rc::clone(&name));
        ws.put(a, 5, 10, 0, Rc::clone(&name));
        let order: Vec<RectId> = ws.ascending().collect();
        assert_eq!(order, vec![a, b]);
    }

    #[test]
    fn remove_drops_from_ascending_iteration() {
        let mut ws = WeightSet::default();
        let a = id(0);
        let name: Rc<str> = Rc::from("e");
        ws.put(a, 30, 10, 0, name);
        ws.remove(a);
        assert_eq!(ws.len(), 0);
    }
}
