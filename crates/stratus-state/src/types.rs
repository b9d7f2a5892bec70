//! Persisted domain types for the catalog and label stores.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Canonical normalized instance-type descriptor.
///
/// Rows are produced by the spec catalog crawler (and explicit register
/// operations) and keyed by `{namespace}/{id}` where the id is the composite
/// `{provider}+{region}+{cspSpecName}` in naming-rule form.
///
/// The serialized (camelCase) field names double as the catalog's column
/// names for predicate queries; [`SpecEntry::TEXT_COLUMNS`] and
/// [`SpecEntry::NUM_COLUMNS`] are the authoritative lists that filter
/// schemas are validated against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecEntry {
    pub namespace: String,
    pub id: String,
    pub csp_spec_name: String,
    pub connection_name: String,
    pub provider_name: String,
    pub region_name: String,
    pub infra_type: String,
    pub vcpu: u16,
    #[serde(rename = "memoryGiB")]
    pub memory_gib: f32,
    #[serde(rename = "diskSizeGB")]
    pub disk_size_gb: f32,
    pub accelerator_type: String,
    pub accelerator_model: String,
    pub accelerator_count: u8,
    #[serde(rename = "acceleratorMemoryGB")]
    pub accelerator_memory_gb: f32,
    pub cost_per_hour: f32,
    pub evaluation_score: f32,
    pub system_label: String,
}

impl SpecEntry {
    /// Text columns addressable by substring predicates.
    pub const TEXT_COLUMNS: &'static [&'static str] = &[
        "id",
        "cspSpecName",
        "connectionName",
        "providerName",
        "regionName",
        "infraType",
        "acceleratorType",
        "acceleratorModel",
        "systemLabel",
    ];

    /// Numeric columns addressable by range predicates.
    pub const NUM_COLUMNS: &'static [&'static str] = &[
        "vcpu",
        "memoryGiB",
        "diskSizeGB",
        "acceleratorCount",
        "acceleratorMemoryGB",
        "costPerHour",
        "evaluationScore",
    ];

    /// Catalog key for this entry's namespace and id.
    pub fn catalog_key(namespace: &str, id: &str) -> String {
        format!("{}/{}", namespace.to_lowercase(), id.to_lowercase())
    }

    /// This entry's own catalog key.
    pub fn key(&self) -> String {
        Self::catalog_key(&self.namespace, &self.id)
    }

    /// Value of a text column, if the column exists.
    pub fn text_column(&self, column: &str) -> Option<&str> {
        match column {
            "id" => Some(&self.id),
            "cspSpecName" => Some(&self.csp_spec_name),
            "connectionName" => Some(&self.connection_name),
            "providerName" => Some(&self.provider_name),
            "regionName" => Some(&self.region_name),
            "infraType" => Some(&self.infra_type),
            "acceleratorType" => Some(&self.accelerator_type),
            "acceleratorModel" => Some(&self.accelerator_model),
            "systemLabel" => Some(&self.system_label),
            _ => None,
        }
    }

    /// Value of a numeric column widened to f64, if the column exists.
    pub fn num_column(&self, column: &str) -> Option<f64> {
        match column {
            "vcpu" => Some(f64::from(self.vcpu)),
            "memoryGiB" => Some(f64::from(self.memory_gib)),
            "diskSizeGB" => Some(f64::from(self.disk_size_gb)),
            "acceleratorCount" => Some(f64::from(self.accelerator_count)),
            "acceleratorMemoryGB" => Some(f64::from(self.accelerator_memory_gb)),
            "costPerHour" => Some(f64::from(self.cost_per_hour)),
            "evaluationScore" => Some(f64::from(self.evaluation_score)),
            _ => None,
        }
    }
}

/// Secondary label index entry.
///
/// Written independently of the primary object; consistency between the two
/// stores is eventual, not transactional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelEntry {
    /// Resource kind the labeled object belongs to.
    pub kind: String,
    /// Globally unique uid of the labeled object.
    pub uid: String,
    /// Primary-store key of the labeled object.
    pub object_key: String,
    /// Free-form tag map.
    pub tags: HashMap<String, String>,
}
