//! Spec catalog adapter.
//!
//! Catalog rows live in an append-log table keyed by insertion sequence,
//! with a separate key index mapping `{ns}/{id}` to the newest row. The key
//! index is what gives insert its conflict semantics; the append-log itself
//! enforces no uniqueness, so repeated or concurrent crawls can leave
//! duplicate rows behind. [`StateStore::dedup_specs`] is the compensating
//! maintenance pass: it keeps only the most recently inserted row per
//! `(namespace, id)` group and repairs the index.
//!
//! Bulk insert batches rows at a fixed ceiling inside one write transaction
//! per batch. A failing batch rolls back only itself: prior batches stay
//! committed and later batches are never attempted.

use std::collections::{HashMap, HashSet};

use redb::{ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::store::{StateStore, map_err};
use crate::tables::*;
use crate::types::SpecEntry;

/// Maximum number of rows written per bulk-insert transaction.
pub const SPEC_BATCH_SIZE: usize = 90;

/// A single conjunct of a catalog predicate query.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Case-insensitive equality on a text column.
    Eq(&'static str, String),
    /// Case-insensitive substring match on a text column.
    Contains(&'static str, String),
    /// Numeric column >= bound.
    Ge(&'static str, f64),
    /// Numeric column <= bound.
    Le(&'static str, f64),
}

impl Predicate {
    fn matches(&self, entry: &SpecEntry) -> StateResult<bool> {
        match self {
            Predicate::Eq(column, wanted) => {
                let value = entry
                    .text_column(column)
                    .ok_or_else(|| StateError::UnknownColumn((*column).to_string()))?;
                Ok(value.eq_ignore_ascii_case(wanted))
            }
            Predicate::Contains(column, needle) => {
                let hay = entry
                    .text_column(column)
                    .ok_or_else(|| StateError::UnknownColumn((*column).to_string()))?;
                Ok(hay.to_lowercase().contains(&needle.to_lowercase()))
            }
            Predicate::Ge(column, bound) => {
                let value = entry
                    .num_column(column)
                    .ok_or_else(|| StateError::UnknownColumn((*column).to_string()))?;
                Ok(value >= *bound)
            }
            Predicate::Le(column, bound) => {
                let value = entry
                    .num_column(column)
                    .ok_or_else(|| StateError::UnknownColumn((*column).to_string()))?;
                Ok(value <= *bound)
            }
        }
    }
}

impl StateStore {
    // ── Spec catalog ───────────────────────────────────────────────

    /// Insert a new catalog row. Fails with `Conflict` if the key index
    /// already holds this entry's `(namespace, id)`.
    pub fn insert_spec(&self, entry: &SpecEntry) -> StateResult<()> {
        let key = entry.key();
        let bytes = serde_json::to_vec(entry).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut keys = txn.open_table(SPEC_KEYS).map_err(map_err!(Table))?;
            if keys.get(key.as_str()).map_err(map_err!(Read))?.is_some() {
                // Dropping the transaction without commit aborts it.
                return Err(StateError::Conflict(key));
            }
            let mut meta = txn.open_table(META).map_err(map_err!(Table))?;
            let seq = meta
                .get(SPEC_NEXT_SEQ)
                .map_err(map_err!(Read))?
                .map(|g| g.value())
                .unwrap_or(0);
            meta.insert(SPEC_NEXT_SEQ, seq + 1)
                .map_err(map_err!(Write))?;
            let mut rows = txn.open_table(SPEC_ROWS).map_err(map_err!(Table))?;
            rows.insert(seq, bytes.as_slice()).map_err(map_err!(Write))?;
            keys.insert(key.as_str(), seq).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, "spec inserted");
        Ok(())
    }

    /// Update the row the key index points at. Fails with `NotFound` if the
    /// entry's `(namespace, id)` is not indexed.
    pub fn update_spec(&self, entry: &SpecEntry) -> StateResult<()> {
        let key = entry.key();
        let bytes = serde_json::to_vec(entry).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let keys = txn.open_table(SPEC_KEYS).map_err(map_err!(Table))?;
            let seq = keys
                .get(key.as_str())
                .map_err(map_err!(Read))?
                .map(|g| g.value())
                .ok_or_else(|| StateError::NotFound(key.clone()))?;
            drop(keys);
            let mut rows = txn.open_table(SPEC_ROWS).map_err(map_err!(Table))?;
            rows.insert(seq, bytes.as_slice()).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, "spec updated");
        Ok(())
    }

    /// Insert, or update on key conflict when the caller opted in.
    ///
    /// Without `update_on_conflict` the conflict propagates unchanged.
    pub fn insert_or_update_spec(
        &self,
        entry: &SpecEntry,
        update_on_conflict: bool,
    ) -> StateResult<()> {
        match self.insert_spec(entry) {
            Err(StateError::Conflict(_)) if update_on_conflict => self.update_spec(entry),
            other => other,
        }
    }

    /// Bulk-insert catalog rows in batches of [`SPEC_BATCH_SIZE`], one write
    /// transaction per batch. Returns the number of rows committed.
    ///
    /// A key conflicting with previously committed state fails its batch
    /// (that batch rolls back; earlier batches stay; later batches are not
    /// attempted). A key repeated *within* one batch is appended blindly —
    /// this is the race window that leaves duplicate rows for
    /// [`StateStore::dedup_specs`] to clean up.
    pub fn bulk_insert_specs(&self, entries: &[SpecEntry]) -> StateResult<u32> {
        let mut inserted: u32 = 0;
        for chunk in entries.chunks(SPEC_BATCH_SIZE) {
            let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
            {
                let mut keys = txn.open_table(SPEC_KEYS).map_err(map_err!(Table))?;
                let mut meta = txn.open_table(META).map_err(map_err!(Table))?;
                let mut rows = txn.open_table(SPEC_ROWS).map_err(map_err!(Table))?;
                let mut seq = meta
                    .get(SPEC_NEXT_SEQ)
                    .map_err(map_err!(Read))?
                    .map(|g| g.value())
                    .unwrap_or(0);
                let mut batch_keys: HashSet<String> = HashSet::new();

                for entry in chunk {
                    let key = entry.key();
                    let committed_conflict = keys
                        .get(key.as_str())
                        .map_err(map_err!(Read))?
                        .is_some()
                        && !batch_keys.contains(&key);
                    if committed_conflict {
                        // Abort this batch only; the transaction is dropped
                        // without commit.
                        return Err(StateError::Conflict(format!(
                            "bulk insert: {key} already exists"
                        )));
                    }
                    let bytes = serde_json::to_vec(entry).map_err(map_err!(Serialize))?;
                    rows.insert(seq, bytes.as_slice()).map_err(map_err!(Write))?;
                    keys.insert(key.as_str(), seq).map_err(map_err!(Write))?;
                    batch_keys.insert(key);
                    seq += 1;
                }
                meta.insert(SPEC_NEXT_SEQ, seq).map_err(map_err!(Write))?;
            }
            txn.commit().map_err(map_err!(Transaction))?;
            inserted += chunk.len() as u32;
            debug!(batch = chunk.len(), total = inserted, "spec batch committed");
        }
        Ok(inserted)
    }

    /// Get a catalog entry by id, falling back to a case-insensitive scan
    /// over provider spec names (`cspSpecName`).
    pub fn get_spec(&self, ns: &str, spec_key: &str) -> StateResult<SpecEntry> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let keys = txn.open_table(SPEC_KEYS).map_err(map_err!(Table))?;
        let rows = txn.open_table(SPEC_ROWS).map_err(map_err!(Table))?;

        let index_key = SpecEntry::catalog_key(ns, spec_key);
        if let Some(seq) = keys.get(index_key.as_str()).map_err(map_err!(Read))? {
            if let Some(row) = rows.get(seq.value()).map_err(map_err!(Read))? {
                let entry: SpecEntry =
                    serde_json::from_slice(row.value()).map_err(map_err!(Deserialize))?;
                return Ok(entry);
            }
        }

        // ex: the caller passed `t3.large` rather than the catalog id.
        for row in rows.iter().map_err(map_err!(Read))? {
            let (_, value) = row.map_err(map_err!(Read))?;
            let entry: SpecEntry =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            if entry.namespace.eq_ignore_ascii_case(ns)
                && entry.csp_spec_name.eq_ignore_ascii_case(spec_key)
            {
                return Ok(entry);
            }
        }

        Err(StateError::NotFound(format!(
            "spec {spec_key} not found in namespace {ns} by id or cspSpecName"
        )))
    }

    /// Query catalog rows for a namespace under a conjunction of predicates.
    ///
    /// Zero matches is a successful empty result. Rows come back in storage
    /// order; no further ordering is guaranteed.
    pub fn query_specs(&self, ns: &str, predicates: &[Predicate]) -> StateResult<Vec<SpecEntry>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let rows = txn.open_table(SPEC_ROWS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        'rows: for row in rows.iter().map_err(map_err!(Read))? {
            let (_, value) = row.map_err(map_err!(Read))?;
            let entry: SpecEntry =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            if !entry.namespace.eq_ignore_ascii_case(ns) {
                continue;
            }
            for predicate in predicates {
                if !predicate.matches(&entry)? {
                    continue 'rows;
                }
            }
            results.push(entry);
        }
        Ok(results)
    }

    /// Remove duplicate catalog rows for a namespace, keeping only the
    /// most-recently-inserted row per `(namespace, id)` group, and repair
    /// the key index. Returns the number of rows removed.
    pub fn dedup_specs(&self, ns: &str) -> StateResult<u32> {
        // Collect the newest sequence per id in a read transaction first.
        let mut newest: HashMap<String, u64> = HashMap::new();
        let mut all: Vec<(u64, String)> = Vec::new();
        {
            let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
            let rows = txn.open_table(SPEC_ROWS).map_err(map_err!(Table))?;
            for row in rows.iter().map_err(map_err!(Read))? {
                let (seq, value) = row.map_err(map_err!(Read))?;
                let entry: SpecEntry =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                if !entry.namespace.eq_ignore_ascii_case(ns) {
                    continue;
                }
                let id = entry.id.to_lowercase();
                let seq = seq.value();
                all.push((seq, id.clone()));
                newest
                    .entry(id)
                    .and_modify(|s| *s = (*s).max(seq))
                    .or_insert(seq);
            }
        }

        let doomed: Vec<u64> = all
            .iter()
            .filter(|(seq, id)| newest[id] != *seq)
            .map(|(seq, _)| *seq)
            .collect();
        if doomed.is_empty() {
            return Ok(0);
        }

        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut rows = txn.open_table(SPEC_ROWS).map_err(map_err!(Table))?;
            let mut keys = txn.open_table(SPEC_KEYS).map_err(map_err!(Table))?;
            for seq in &doomed {
                rows.remove(seq).map_err(map_err!(Write))?;
            }
            for (id, seq) in &newest {
                let key = SpecEntry::catalog_key(ns, id);
                keys.insert(key.as_str(), *seq).map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(ns, removed = doomed.len(), "duplicate specs removed");
        Ok(doomed.len() as u32)
    }
}
