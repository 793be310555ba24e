//! The coalescing engine: ties the entity table, tag table, rectangle
//! slab, and weight multiset together into the ingest/emit surface
//! described in §6.

use std::path::Path;
use std::rc::Rc;

use memmap2::Mmap;
use tracing::{debug, warn};

use crate::config::IngestConfig;
use crate::datum;
use crate::entity::{EntityId, EntityTable};
use crate::error::{
    IllegalStateValueSnafu, MissingMetadataSnafu, MissingStateSnafu, MissingTimeOrDescriptionSnafu,
    MmapSnafu, OpenSnafu, Result, StatSnafu, TimeOutOfOrderSnafu,
};
use crate::metadata;
use crate::rect::{RectId, Rectangle};
use crate::record::{Record, TagRecord};
use crate::scanner::Scanner;
use crate::tagdef::{TagDefId, TagTable};
use crate::weightset::WeightSet;

/// Ingest counters, exposed to the caller alongside the coalesce count
/// returned from [`Statemap::ingest`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Counters {
    pub ncoalesced: u64,
    pub nevents: u64,
    pub nelisions: u64,
}

/// Owns every entity, rectangle, and tag definition for one ingest.
/// Not thread-shared; multiple instances may run in parallel, each
/// owning its own storage.
pub struct Statemap {
    config: IngestConfig,
    nstates: u32,
    entities: EntityTable,
    tags: TagTable,
    rects: crate::rect::RectSlab,
    weights: WeightSet,
    counters: Counters,
    last_error: Option<String>,
}

impl Statemap {
    pub fn create(config: IngestConfig) -> Self {
        Statemap {
            config,
            nstates: 0,
            entities: EntityTable::default(),
            tags: TagTable::default(),
            rects: crate::rect::RectSlab::default(),
            weights: WeightSet::default(),
            counters: Counters::default(),
            last_error: None,
        }
    }

    pub fn errmsg(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// Maps `path`, ingests the whole trace, and delivers records to
    /// `emit` in emission order. Returns the coalesce count.
    pub fn ingest(&mut self, path: &Path, mut emit: impl FnMut(Record)) -> Result<u64> {
        let result = self.ingest_inner(path, &mut emit);

        if let Err(e) = &result {
            self.last_error = Some(e.to_string());
        }

        result
    }

    fn ingest_inner(&mut self, path: &Path, emit: &mut impl FnMut(Record)) -> Result<u64> {
        let file = std::fs::File::open(path).map_err(|source| {
            OpenSnafu {
                path: path.to_path_buf(),
                source,
            }
            .build()
        })?;

        file.metadata().map_err(|source| {
            StatSnafu {
                path: path.to_path_buf(),
                source,
            }
            .build()
        })?;

        let mmap = unsafe { Mmap::map(&file) }.map_err(|source| {
            MmapSnafu {
                path: path.to_path_buf(),
                source,
            }
            .build()
        })?;

        let span = tracing::info_span!("statemap_ingest", path = %path.display());
        let _guard = span.enter();

        let mut scanner = Scanner::new(&mmap[..]);

        let first = scanner
            .next_blob()?
            .ok_or_else(|| MissingMetadataSnafu.build())?;

        let meta = metadata::parse(first.bytes)?;
        self.nstates = meta.nstates;
        debug!(nstates = meta.nstates, "parsed metadata");

        while let Some(blob) = scanner.next_blob()? {
            self.ingest_datum(blob.bytes, blob.line)?;
        }

        self.finalize()?;
        self.emit(emit);

        Ok(self.counters.ncoalesced)
    }

    fn ingest_datum(&mut self, bytes: &[u8], line: u64) -> Result<()> {
        let fields = datum::parse(bytes, line)?;
        let entity_id = self.entities.lookup_or_insert(&fields.entity);

        let Some(time) = fields.time else {
            let description = fields
                .description
                .ok_or_else(|| MissingTimeOrDescriptionSnafu { line }.build())?;
            self.entities.get_mut(entity_id).description = Some(description);
            return Ok(());
        };

        let Some(state) = fields.state else {
            if fields.event_present {
                self.counters.nevents += 1;
                return Ok(());
            }
            return MissingStateSnafu { line }.fail();
        };

        if state < 0 || state as u32 >= self.nstates {
            return IllegalStateValueSnafu { line }.fail();
        }

        self.transition(entity_id, time, state as u32, fields.tag.as_deref(), line)
    }

    /// Applies one state transition per §4.5's five-way chain.
    fn transition(
        &mut self,
        entity_id: EntityId,
        time: u64,
        state: u32,
        tag: Option<&str>,
        line: u64,
    ) -> Result<()> {
        let open_start = self.entities.get(entity_id).open_start;

        let Some(open_start) = open_start else {
            let tagdef = self.resolve_tag(state, tag);
            let entity = self.entities.get_mut(entity_id);
            entity.open_start = Some(time);
            entity.open_state = state;
            entity.open_tag = tagdef;
            return Ok(());
        };

        if time < open_start {
            return TimeOutOfOrderSnafu {
                line,
                time,
                open_start,
            }
            .fail();
        }

        if time == open_start {
            self.counters.nelisions += 1;
            let tagdef = self.resolve_tag(state, tag);
            let entity = self.entities.get_mut(entity_id);
            entity.open_state = state;
            entity.open_tag = tagdef;
            return Ok(());
        }

        if let Some(end) = self.config.end() {
            if time > end {
                return Ok(());
            }
        }

        if time > self.config.begin {
            let clamped_start = open_start.max(self.config.begin);
            self.new_rect(entity_id, clamped_start, time);
        }

        let tagdef = self.resolve_tag(state, tag);
        let entity = self.entities.get_mut(entity_id);
        entity.open_start = Some(time);
        entity.open_state = state;
        entity.open_tag = tagdef;

        Ok(())
    }

    fn resolve_tag(&mut self, state: u32, tag: Option<&str>) -> Option<TagDefId> {
        if self.config.notags {
            return None;
        }

        tag.map(|name| self.tags.lookup_or_insert(state, name, None))
    }

    /// Implements §4.6's new-rectangle procedure: allocate, link into
    /// the entity's chain, insert into the weight multiset, and
    /// coalesce if that pushes the multiset over budget.
    fn new_rect(&mut self, entity_id: EntityId, start: u64, end: u64) {
        let duration = end - start;
        let entity = self.entities.get(entity_id);
        let open_state = entity.open_state;
        let open_tag = entity.open_tag;
        let prev_id = entity.last;

        let mut states = vec![0u64; self.nstates as usize];
        states[open_state as usize] = duration;

        let mut rect = Rectangle {
            start,
            duration,
            weight: 0,
            prev: prev_id,
            next: None,
            entity: entity_id,
            tags: Vec::new(),
            states,
        };

        if let Some(def) = open_tag {
            rect.add_tag(def, duration);
        }

        let rect_id = self.rects.alloc(rect);

        let entity = self.entities.get_mut(entity_id);
        if entity.first.is_none() {
            entity.first = Some(rect_id);
        }
        entity.last = Some(rect_id);

        if let Some(prev_id) = prev_id {
            self.rects.get_mut(prev_id).next = Some(rect_id);
            self.requeue(prev_id);
        }

        self.requeue(rect_id);

        if self.weights.len() as u64 > self.config.maxrect() as u64 {
            self.coalesce();
        }
    }

    /// Recomputes `id`'s weight from its current neighbors and
    /// re-keys it in the multiset.
    fn requeue(&mut self, id: RectId) {
        let weight = self.rects.weight_of(id);
        let rect = self.rects.get(id);
        let (duration, start, entity_id) = (rect.duration, rect.start, rect.entity);
        let name = Rc::clone(&self.entities.get(entity_id).name);
        self.weights.put(id, weight, duration, start, name);
    }

    /// Implements §4.6's coalesce step: find the least-weight
    /// rectangle with a neighbor, merge it into the lighter (or only)
    /// neighbor, and re-key the survivor and its new neighbors.
    fn coalesce(&mut self) {
        let Some(victim) = self
            .weights
            .ascending()
            .find(|&id| {
                let r = self.rects.get(id);
                r.prev.is_some() || r.next.is_some()
            })
        else {
            warn!("no coalesce victim available; rectangle budget exceeded");
            return;
        };

        let v = self.rects.get(victim);
        let (survivor, victim_is_left) = match (v.prev, v.next) {
            (None, Some(next)) => (next, true),
            (Some(prev), None) => (prev, false),
            (Some(prev), Some(next)) => {
                let prev_dur = self.rects.get(prev).duration;
                let next_dur = self.rects.get(next).duration;
                if prev_dur < next_dur {
                    (prev, false)
                } else {
                    (next, true)
                }
            }
            (None, None) => unreachable!("victim without any neighbor cannot be chosen"),
        };

        let (v_start, v_duration, v_states, v_tags, v_prev, v_next) = {
            let v = self.rects.get(victim);
            (v.start, v.duration, v.states.clone(), v.tags.clone(), v.prev, v.next)
        };

        {
            let s = self.rects.get_mut(survivor);
            s.duration += v_duration;
            for (i, d) in v_states.into_iter().enumerate() {
                s.states[i] += d;
            }
            for t in v_tags {
                s.add_tag(t.def, t.duration);
            }
        }

        if victim_is_left {
            self.rects.get_mut(survivor).start = v_start;
            self.rects.get_mut(survivor).prev = v_prev;

            if let Some(vp) = v_prev {
                self.rects.get_mut(vp).next = Some(survivor);
            } else {
                let entity_id = self.rects.get(survivor).entity;
                self.entities.get_mut(entity_id).first = Some(survivor);
            }
        } else {
            self.rects.get_mut(survivor).next = v_next;

            if let Some(vn) = v_next {
                self.rects.get_mut(vn).prev = Some(survivor);
            } else {
                let entity_id = self.rects.get(survivor).entity;
                self.entities.get_mut(entity_id).last = Some(survivor);
            }
        }

        self.weights.remove(victim);
        self.rects.free(victim);
        self.counters.ncoalesced += 1;

        let s_prev = self.rects.get(survivor).prev;
        let s_next = self.rects.get(survivor).next;

        if let Some(p) = s_prev {
            self.requeue(p);
        }
        if let Some(n) = s_next {
            self.requeue(n);
        }
        self.requeue(survivor);
    }

    /// Closes every entity's still-open state at the finalization
    /// time: `config.end` if set and non-zero, otherwise the latest
    /// observed `open_start` across all entities.
    fn finalize(&mut self) -> Result<()> {
        let end = self.config.end().unwrap_or_else(|| {
            self.entities
                .iter()
                .filter_map(|(_, e)| e.open_start)
                .max()
                .unwrap_or(0)
        });

        let ids: Vec<EntityId> = self.entities.iter().map(|(id, _)| id).collect();

        for id in ids {
            let open_start = self.entities.get(id).open_start;

            if let Some(open_start) = open_start {
                if open_start < end {
                    let clamped_start = open_start.max(self.config.begin);
                    if clamped_start < end {
                        self.new_rect(id, clamped_start, end);
                    }
                }
            }
        }

        Ok(())
    }

    /// Delivers records in §4.8's order: tag definitions, then each
    /// entity's description (if any) and rectangles in chain order.
    fn emit(&self, emit: &mut impl FnMut(Record)) {
        for def in self.tags.iter() {
            emit(Record::TagDef {
                name: def.name.to_string(),
                state: def.state,
                index: def.index,
                json: def.json.clone(),
            });
        }

        for (_, entity) in self.entities.iter() {
            if let Some(description) = &entity.description {
                emit(Record::Description {
                    entity: entity.name.to_string(),
                    description: description.clone(),
                });
            }

            let mut cursor = entity.first;
            while let Some(id) = cursor {
                let rect = self.rects.get(id);
                let tags = rect
                    .tags
                    .iter()
                    .map(|t| TagRecord {
                        tag: t.def.index(),
                        duration: t.duration,
                    })
                    .collect();

                emit(Record::Rectangle {
                    entity: entity.name.to_string(),
                    time: rect.start,
                    duration: rect.duration,
                    states: rect.states.clone(),
                    tags,
                });

                cursor = rect.next;
            }
        }
    }
}
