//! Tag definition interning: `(state, name)` pairs assigned a dense,
//! discovery-order index.

use indexmap::IndexMap;

/// Stable handle for an interned tag definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TagDefId(u32);

impl TagDefId {
    pub fn index(self) -> u32 {
        self.0
    }
}

pub struct TagDef {
    pub name: Box<str>,
    pub state: u32,
    pub index: u32,
    pub json: String,
}

/// Interns `(state, name)` pairs to [`TagDefId`]s in discovery order.
#[derive(Default)]
pub struct TagTable {
    index: IndexMap<(u32, Box<str>), TagDefId>,
    defs: Vec<TagDef>,
}

impl TagTable {
    /// Looks up or creates the definition for `(state, name)`. `json`
    /// is only consulted on first sight of this definition; later
    /// sightings keep the originally recorded JSON.
    pub fn lookup_or_insert(&mut self, state: u32, name: &str, json: Option<&str>) -> TagDefId {
        let key = (state, Box::from(name));

        if let Some(&id) = self.index.get(&key) {
            return id;
        }

        let id = TagDefId(self.defs.len() as u32);
        self.defs.push(TagDef {
            name: Box::from(name),
            state,
            index: id.0,
            json: json.unwrap_or("{}").to_string(),
        });
        self.index.insert(key, id);
        id
    }

    pub fn get(&self, id: TagDefId) -> &TagDef {
        &self.defs[id.0 as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagDef> {
        self.defs.iter()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }
}
