//! Rectangle storage: a slab of rectangles addressed by small integer
//! handles, with a free list recycling slots freed by coalescing.

use crate::entity::EntityId;
use crate::tagdef::TagDefId;

/// Stable-for-its-lifetime handle into a [`RectSlab`]. Reused once the
/// rectangle it named has been freed by a coalesce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RectId(u32);

/// How much of a rectangle's time in its tag-bearing state is
/// attributed to one tag definition.
#[derive(Debug, Clone, Copy)]
pub struct TagEntry {
    pub def: TagDefId,
    pub duration: u64,
}

pub struct Rectangle {
    pub start: u64,
    pub duration: u64,
    pub weight: u64,
    pub prev: Option<RectId>,
    pub next: Option<RectId>,
    pub entity: EntityId,
    /// At most one entry per tag definition (merged entries are folded
    /// by summing durations, per the spec's permitted fold).
    pub tags: Vec<TagEntry>,
    pub states: Vec<u64>,
}

impl Rectangle {
    pub fn recompute_weight(&self, prev: Option<&Rectangle>, next: Option<&Rectangle>) -> u64 {
        self.duration + prev.map_or(0, |r| r.duration) + next.map_or(0, |r| r.duration)
    }

    pub fn add_tag(&mut self, def: TagDefId, duration: u64) {
        if duration == 0 {
            return;
        }

        if let Some(entry) = self.tags.iter_mut().find(|t| t.def == def) {
            entry.duration += duration;
        } else {
            self.tags.push(TagEntry { def, duration });
        }
    }
}

/// Owns rectangle storage for one [`crate::Statemap`]. Rectangles are
/// allocated from a free list when available, otherwise appended; a
/// freed slot never outlives the slab itself.
#[derive(Default)]
pub struct RectSlab {
    slots: Vec<Rectangle>,
    free: Vec<RectId>,
}

impl RectSlab {
    pub fn alloc(&mut self, rect: Rectangle) -> RectId {
        if let Some(id) = self.free.pop() {
            self.slots[id.0 as usize] = rect;
            id
        } else {
            let id = RectId(self.slots.len() as u32);
            self.slots.push(rect);
            id
        }
    }

    pub fn free(&mut self, id: RectId) {
        self.free.push(id);
    }

    pub fn get(&self, id: RectId) -> &Rectangle {
        &self.slots[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: RectId) -> &mut Rectangle {
        &mut self.slots[id.0 as usize]
    }

    pub fn get_opt(&self, id: Option<RectId>) -> Option<&Rectangle> {
        id.map(|id| self.get(id))
    }

    /// Recomputes and returns `rect`'s weight from its current
    /// neighbors, without touching the weight multiset.
    pub fn weight_of(&self, id: RectId) -> u64 {
        let rect = self.get(id);
        let prev = self.get_opt(rect.prev);
        let next = self.get_opt(rect.next);
        rect.recompute_weight(prev, next)
    }
}
