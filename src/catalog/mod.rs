//! `ContentCatalog`: process-wide, read-mostly lookups over pre-compiled
//! game data (spec §4.1).
//!
//! Every table is keyed by a non-negative integer id; heterogeneity lives
//! inside the entry record, represented here as `serde_json::Value` — the
//! catalog itself stays uniform, matching spec.md's framing ("The catalog's
//! uniformity: every table is keyed by a non-negative integer id").
//!
//! Built once at startup from JSON content files (optionally backed by a
//! compiled cache, see [`source`]) and handed out by `Arc` — no locking on
//! the read path, per spec §5 ("ContentCatalog tables are read-only after
//! init; readable by any worker lock-free").

pub mod loot;
pub mod source;

use std::collections::BTreeMap;
use std::collections::HashMap;

use serde_json::Value;

use crate::error::CatalogError;

// ---------------------------------------------------------------------------
// Index keys
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexKey {
    Int(i64),
    Str(String),
}

impl IndexKey {
    /// Normalizes a JSON value used as an index key into a canonical
    /// representation. A `null` key excludes the entry from the index
    /// (spec §4.1: "missing (null) key values are excluded").
    fn from_value(value: &Value) -> Option<IndexKey> {
        match value {
            Value::Null => None,
            Value::Number(n) => n.as_i64().map(IndexKey::Int),
            Value::String(s) => Some(IndexKey::Str(s.clone())),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

struct Table {
    entries: BTreeMap<i64, Value>,
    /// index_name -> (key -> primary ids)
    indexes: HashMap<String, HashMap<IndexKey, Vec<i64>>>,
}

impl Table {
    fn new(entries: BTreeMap<i64, Value>) -> Self {
        Self {
            entries,
            indexes: HashMap::new(),
        }
    }

    /// Groups entries by the value at `field` (a top-level object key),
    /// building a secondary index. Entries whose field is absent or `null`
    /// are excluded from the index, not from the table.
    fn build_index(&mut self, index_name: &str, field: &str) {
        let mut grouped: HashMap<IndexKey, Vec<i64>> = HashMap::new();
        for (&id, entry) in &self.entries {
            if let Some(field_value) = entry.get(field) {
                if let Some(key) = IndexKey::from_value(field_value) {
                    grouped.entry(key).or_default().push(id);
                }
            }
        }
        self.indexes.insert(index_name.to_string(), grouped);
    }

    /// Groups entries by the tuple of values at `fields`, joined into one
    /// composite key (composite secondary indexes, spec §4.1).
    fn build_composite_index(&mut self, index_name: &str, fields: &[&str]) {
        let mut grouped: HashMap<IndexKey, Vec<i64>> = HashMap::new();
        for (&id, entry) in &self.entries {
            let mut parts = Vec::with_capacity(fields.len());
            let mut all_present = true;
            for field in fields {
                match entry.get(*field).and_then(IndexKey::from_value) {
                    Some(IndexKey::Int(i)) => parts.push(i.to_string()),
                    Some(IndexKey::Str(s)) => parts.push(s),
                    None => {
                        all_present = false;
                        break;
                    }
                }
            }
            if all_present {
                grouped
                    .entry(IndexKey::Str(parts.join("\u{1}")))
                    .or_default()
                    .push(id);
            }
        }
        self.indexes.insert(index_name.to_string(), grouped);
    }
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// Opaque continuation token for `list_paginated`/`list_continue`.
///
/// Not restartable across catalog mutations — but the catalog is immutable
/// post-init, so a token remains valid for the process lifetime.
#[derive(Debug, Clone, Copy)]
pub struct Continuation {
    table_generation: u64,
    next_after_id: i64,
}

// ---------------------------------------------------------------------------
// ContentCatalog
// ---------------------------------------------------------------------------

pub struct ContentCatalog {
    tables: HashMap<String, Table>,
    generation: u64,
}

impl ContentCatalog {
    pub fn builder() -> ContentCatalogBuilder {
        ContentCatalogBuilder::default()
    }

    pub fn get(&self, table: &str, primary_id: i64) -> Result<&Value, CatalogError> {
        self.table(table)?
            .entries
            .get(&primary_id)
            .ok_or_else(|| CatalogError::NotFound(table.to_string(), primary_id))
    }

    /// Finite snapshot of every entry in a table, in primary-id order. Not
    /// restartable across mutation, but the catalog never mutates after
    /// init, so this is always safe to iterate fully.
    pub fn list(&self, table: &str) -> Result<Vec<&Value>, CatalogError> {
        Ok(self.table(table)?.entries.values().collect())
    }

    pub fn list_paginated(
        &self,
        table: &str,
        limit: usize,
    ) -> Result<(Vec<&Value>, Option<Continuation>), CatalogError> {
        self.list_paginated_after(table, limit, i64::MIN)
    }

    pub fn list_continue(
        &self,
        table: &str,
        limit: usize,
        token: Continuation,
    ) -> Result<(Vec<&Value>, Option<Continuation>), CatalogError> {
        if token.table_generation != self.generation {
            return Err(CatalogError::InvalidContinuation);
        }
        self.list_paginated_after(table, limit, token.next_after_id)
    }

    fn list_paginated_after(
        &self,
        table: &str,
        limit: usize,
        after_id_exclusive_floor: i64,
    ) -> Result<(Vec<&Value>, Option<Continuation>), CatalogError> {
        let t = self.table(table)?;
        let mut iter = t.entries.range((
            std::ops::Bound::Excluded(after_id_exclusive_floor),
            std::ops::Bound::Unbounded,
        ));
        let mut batch = Vec::with_capacity(limit);
        let mut last_id = after_id_exclusive_floor;
        for (&id, value) in iter.by_ref() {
            if batch.len() == limit {
                break;
            }
            batch.push(value);
            last_id = id;
        }
        let continuation = if iter.next().is_some() {
            Some(Continuation {
                table_generation: self.generation,
                next_after_id: last_id,
            })
        } else {
            None
        };
        Ok((batch, continuation))
    }

    pub fn index_lookup(&self, table: &str, index_name: &str, key: &IndexKey) -> Vec<i64> {
        self.tables
            .get(table)
            .and_then(|t| t.indexes.get(index_name))
            .and_then(|idx| idx.get(key))
            .cloned()
            .unwrap_or_default()
    }

    pub fn fetch_by_ids(&self, table: &str, ids: &[i64]) -> Result<Vec<&Value>, CatalogError> {
        let t = self.table(table)?;
        Ok(ids.iter().filter_map(|id| t.entries.get(id)).collect())
    }

    fn table(&self, name: &str) -> Result<&Table, CatalogError> {
        self.tables
            .get(name)
            .ok_or_else(|| CatalogError::UnknownTable(name.to_string()))
    }
}

#[derive(Default)]
pub struct ContentCatalogBuilder {
    tables: HashMap<String, Table>,
}

impl ContentCatalogBuilder {
    /// Loads a table from a list of id-keyed JSON records (spec §6: "a
    /// list of id-keyed records"). Each record must have an integer `id`
    /// field.
    pub fn with_table(mut self, name: &str, records: Vec<Value>) -> Result<Self, CatalogError> {
        let mut entries = BTreeMap::new();
        for record in records {
            let id = record
                .get("id")
                .and_then(Value::as_i64)
                .ok_or_else(|| CatalogError::Malformed(name.to_string(), "missing id".into()))?;
            entries.insert(id, record);
        }
        self.tables.insert(name.to_string(), Table::new(entries));
        Ok(self)
    }

    pub fn with_index(mut self, table: &str, index_name: &str, field: &str) -> Self {
        if let Some(t) = self.tables.get_mut(table) {
            t.build_index(index_name, field);
        }
        self
    }

    pub fn with_composite_index(mut self, table: &str, index_name: &str, fields: &[&str]) -> Self {
        if let Some(t) = self.tables.get_mut(table) {
            t.build_composite_index(index_name, fields);
        }
        self
    }

    pub fn build(self) -> ContentCatalog {
        ContentCatalog {
            tables: self.tables,
            generation: 0,
        }
    }
}
