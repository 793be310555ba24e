//! Entity interning: stable handles for named entities, with
//! insertion-order iteration for deterministic emission.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::rect::RectId;
use crate::tagdef::TagDefId;

/// Stable handle for an interned entity. Indexes into
/// [`EntityTable::entities`]; entities are never removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(u32);

/// One entity's current state: its rectangle chain endpoints and the
/// state it is presently open in (not yet closed by a later datum).
pub struct Entity {
    pub name: Rc<str>,
    pub description: Option<String>,
    pub first: Option<RectId>,
    pub last: Option<RectId>,
    /// `None` means "no state has been seen yet for this entity".
    pub open_start: Option<u64>,
    pub open_state: u32,
    pub open_tag: Option<TagDefId>,
}

impl Entity {
    fn new(name: Rc<str>) -> Self {
        Entity {
            name,
            description: None,
            first: None,
            last: None,
            open_start: None,
            open_state: 0,
            open_tag: None,
        }
    }
}

/// Interns entity names to [`EntityId`]s and keeps entities in
/// insertion order for the emission pass. A growable map stands in for
/// the original's fixed 8192-bucket hash chain (permitted by the spec
/// provided lookup stays amortized O(1) and iteration order matches
/// insertion order).
#[derive(Default)]
pub struct EntityTable {
    index: IndexMap<Rc<str>, EntityId>,
    entities: Vec<Entity>,
}

impl EntityTable {
    pub fn lookup_or_insert(&mut self, name: &str) -> EntityId {
        if let Some(&id) = self.index.get(name) {
            return id;
        }

        let name: Rc<str> = Rc::from(name);
        let id = EntityId(self.entities.len() as u32);
        self.entities.push(Entity::new(Rc::clone(&name)));
        self.index.insert(name, id);
        id
    }

    pub fn get(&self, id: EntityId) -> &Entity {
        &self.entities[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: EntityId) -> &mut Entity {
        &mut self.entities[id.0 as usize]
    }

    /// Entities in insertion order, for deterministic emission.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities
            .iter()
            .enumerate()
            .map(|(i, e)| (EntityId(i as u32), e))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
