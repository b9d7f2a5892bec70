//! Label index.
//!
//! A secondary, searchable tag mapping keyed by resource uid. Label writes
//! happen strictly after the primary object write and are never part of the
//! same transaction; a failed label write leaves the primary object intact.

use redb::{ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::StateResult;
use crate::store::{StateStore, map_err};
use crate::tables::LABELS;
use crate::types::LabelEntry;

use std::collections::HashMap;

impl StateStore {
    // ── Label index ────────────────────────────────────────────────

    /// Create or replace the label entry for a resource uid.
    pub fn create_or_update_label(
        &self,
        kind: &str,
        uid: &str,
        object_key: &str,
        tags: HashMap<String, String>,
    ) -> StateResult<()> {
        let entry = LabelEntry {
            kind: kind.to_string(),
            uid: uid.to_string(),
            object_key: object_key.to_string(),
            tags,
        };
        let bytes = serde_json::to_vec(&entry).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(LABELS).map_err(map_err!(Table))?;
            table
                .insert(uid, bytes.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%uid, kind, "label stored");
        Ok(())
    }

    /// Get the label entry for a uid.
    pub fn get_label(&self, uid: &str) -> StateResult<Option<LabelEntry>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(LABELS).map_err(map_err!(Table))?;
        match table.get(uid).map_err(map_err!(Read))? {
            Some(guard) => {
                let entry: LabelEntry =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Delete the label entry for a uid. Returns true if it existed.
    pub fn delete_label(&self, uid: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(LABELS).map_err(map_err!(Table))?;
            existed = table.remove(uid).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(existed)
    }
}
