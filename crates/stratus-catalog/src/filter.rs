//! Query/filter engine over the spec catalog.
//!
//! A [`SpecFilter`] is a flat record of optional text probes and numeric
//! ranges. Text probes are normalized to the catalog's naming convention and
//! matched as case-insensitive substrings; range bounds translate into
//! `>=`/`<=` predicates. All conjuncts AND together on top of the namespace
//! equality the catalog applies itself.
//!
//! Filter fields map onto catalog columns through an explicit static binding
//! table; [`validate_bindings`] checks the table against the catalog schema
//! once at startup and fails fast on drift. The binding names are a
//! documented contract with [`SpecEntry::TEXT_COLUMNS`] /
//! [`SpecEntry::NUM_COLUMNS`].

use serde::{Deserialize, Serialize};

use stratus_core::{Error, Result, check_id, to_safe_id};
use stratus_state::{Predicate, SpecEntry, StateStore};

/// An optional numeric range with independent bounds.
///
/// An absent **or zero-valued** bound is treated as unconstrained on that
/// side. Known limitation, kept deliberately: a genuine zero-value
/// constraint (e.g. accelerator count exactly 0) cannot be expressed with
/// this representation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NumRange {
    pub min: Option<f32>,
    pub max: Option<f32>,
}

impl NumRange {
    /// The effective lower bound, if one is constrained.
    fn effective_min(self) -> Option<f32> {
        self.min.filter(|m| *m != 0.0)
    }

    /// The effective upper bound, if one is constrained.
    fn effective_max(self) -> Option<f32> {
        self.max.filter(|m| *m != 0.0)
    }
}

/// Filter record for catalog queries. Empty fields do not constrain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpecFilter {
    pub id: Option<String>,
    pub provider_name: Option<String>,
    pub region_name: Option<String>,
    pub csp_spec_name: Option<String>,
    pub infra_type: Option<String>,
    pub accelerator_type: Option<String>,
    pub accelerator_model: Option<String>,
    pub vcpu: NumRange,
    #[serde(rename = "memoryGiB")]
    pub memory_gib: NumRange,
    #[serde(rename = "diskSizeGB")]
    pub disk_size_gb: NumRange,
    pub accelerator_count: NumRange,
    #[serde(rename = "acceleratorMemoryGB")]
    pub accelerator_memory_gb: NumRange,
    pub cost_per_hour: NumRange,
    pub evaluation_score: NumRange,
}

struct TextBinding {
    column: &'static str,
    get: for<'a> fn(&'a SpecFilter) -> Option<&'a String>,
}

struct RangeBinding {
    column: &'static str,
    get: fn(&SpecFilter) -> NumRange,
}

static TEXT_BINDINGS: &[TextBinding] = &[
    TextBinding { column: "id", get: |f| f.id.as_ref() },
    TextBinding { column: "providerName", get: |f| f.provider_name.as_ref() },
    TextBinding { column: "regionName", get: |f| f.region_name.as_ref() },
    TextBinding { column: "cspSpecName", get: |f| f.csp_spec_name.as_ref() },
    TextBinding { column: "infraType", get: |f| f.infra_type.as_ref() },
    TextBinding { column: "acceleratorType", get: |f| f.accelerator_type.as_ref() },
    TextBinding { column: "acceleratorModel", get: |f| f.accelerator_model.as_ref() },
];

static RANGE_BINDINGS: &[RangeBinding] = &[
    RangeBinding { column: "vcpu", get: |f| f.vcpu },
    RangeBinding { column: "memoryGiB", get: |f| f.memory_gib },
    RangeBinding { column: "diskSizeGB", get: |f| f.disk_size_gb },
    RangeBinding { column: "acceleratorCount", get: |f| f.accelerator_count },
    RangeBinding { column: "acceleratorMemoryGB", get: |f| f.accelerator_memory_gb },
    RangeBinding { column: "costPerHour", get: |f| f.cost_per_hour },
    RangeBinding { column: "evaluationScore", get: |f| f.evaluation_score },
];

fn validate_against(text_columns: &[&str], num_columns: &[&str]) -> Result<()> {
    for binding in TEXT_BINDINGS {
        if !text_columns.contains(&binding.column) {
            return Err(Error::Validation(format!(
                "filter binding {:?} has no text column in the catalog schema",
                binding.column
            )));
        }
    }
    for binding in RANGE_BINDINGS {
        if !num_columns.contains(&binding.column) {
            return Err(Error::Validation(format!(
                "filter binding {:?} has no numeric column in the catalog schema",
                binding.column
            )));
        }
    }
    Ok(())
}

/// Check every filter binding against the catalog schema. Call once at
/// startup; a failure means filter and catalog schemas have diverged.
pub fn validate_bindings() -> Result<()> {
    validate_against(SpecEntry::TEXT_COLUMNS, SpecEntry::NUM_COLUMNS)
}

fn build_predicates(filter: &SpecFilter) -> Vec<Predicate> {
    let mut predicates = Vec::new();
    for binding in TEXT_BINDINGS {
        if let Some(probe) = (binding.get)(filter) {
            if !probe.is_empty() {
                predicates.push(Predicate::Contains(binding.column, to_safe_id(probe)));
            }
        }
    }
    for binding in RANGE_BINDINGS {
        let range = (binding.get)(filter);
        if let Some(min) = range.effective_min() {
            predicates.push(Predicate::Ge(binding.column, f64::from(min)));
        }
        if let Some(max) = range.effective_max() {
            predicates.push(Predicate::Le(binding.column, f64::from(max)));
        }
    }
    predicates
}

/// Return all catalog rows in the namespace matching the filter.
///
/// Zero matches is a successful empty result. Rows come back in storage
/// order.
pub fn filter_specs(
    store: &StateStore,
    ns: &str,
    filter: &SpecFilter,
) -> Result<Vec<SpecEntry>> {
    check_id(ns)?;
    let predicates = build_predicates(filter);
    Ok(store.query_specs(ns, &predicates)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(id: &str, vcpu: u16, memory_gib: f32, accel_count: u8) -> SpecEntry {
        SpecEntry {
            namespace: "ns01".to_string(),
            id: id.to_string(),
            csp_spec_name: id.rsplit('-').next().unwrap().to_string(),
            connection_name: "aws-seoul".to_string(),
            provider_name: if id.starts_with("aws") { "aws" } else { "gcp" }.to_string(),
            region_name: "ap-northeast-2".to_string(),
            infra_type: "vm".to_string(),
            vcpu,
            memory_gib,
            disk_size_gb: 0.0,
            accelerator_type: if accel_count > 0 { "gpu" } else { "" }.to_string(),
            accelerator_model: String::new(),
            accelerator_count: accel_count,
            accelerator_memory_gb: 0.0,
            cost_per_hour: 0.1,
            evaluation_score: 0.5,
            system_label: "auto-gen".to_string(),
        }
    }

    fn seeded_store() -> StateStore {
        let store = StateStore::open_in_memory().unwrap();
        store.insert_spec(&spec("aws-a-small", 2, 4.0, 0)).unwrap();
        store.insert_spec(&spec("aws-b-medium", 4, 16.0, 0)).unwrap();
        store.insert_spec(&spec("gcp-c-large", 8, 64.0, 4)).unwrap();
        store
    }

    #[test]
    fn bindings_match_the_catalog_schema() {
        validate_bindings().unwrap();
    }

    #[test]
    fn binding_drift_fails_fast() {
        // Simulate a catalog schema that lost a column.
        let err = validate_against(&["id", "providerName"], SpecEntry::NUM_COLUMNS);
        assert!(matches!(err, Err(Error::Validation(_))));

        let err = validate_against(SpecEntry::TEXT_COLUMNS, &["vcpu"]);
        assert!(matches!(err, Err(Error::Validation(_))));
    }

    #[test]
    fn min_bound_filters_vcpu() {
        let store = seeded_store();
        let filter = SpecFilter {
            vcpu: NumRange { min: Some(3.0), max: None },
            ..SpecFilter::default()
        };

        let hits = filter_specs(&store, "ns01", &filter).unwrap();
        let mut vcpus: Vec<u16> = hits.iter().map(|e| e.vcpu).collect();
        vcpus.sort_unstable();
        assert_eq!(vcpus, vec![4, 8]);
    }

    #[test]
    fn both_bounds_conjoin() {
        let store = seeded_store();
        let filter = SpecFilter {
            vcpu: NumRange { min: Some(3.0), max: Some(6.0) },
            ..SpecFilter::default()
        };

        let hits = filter_specs(&store, "ns01", &filter).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].vcpu, 4);
    }

    #[test]
    fn zero_bound_is_unconstrained() {
        let store = seeded_store();
        // A zero min is indistinguishable from "not provided"; all rows match.
        let filter = SpecFilter {
            accelerator_count: NumRange { min: Some(0.0), max: None },
            ..SpecFilter::default()
        };

        let hits = filter_specs(&store, "ns01", &filter).unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn text_probe_is_normalized_and_substring_matched() {
        let store = seeded_store();
        let filter = SpecFilter {
            provider_name: Some("AWS".to_string()),
            ..SpecFilter::default()
        };

        let hits = filter_specs(&store, "ns01", &filter).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|e| e.provider_name == "aws"));
    }

    #[test]
    fn text_and_range_conjoin() {
        let store = seeded_store();
        let filter = SpecFilter {
            provider_name: Some("aws".to_string()),
            memory_gib: NumRange { min: Some(8.0), max: None },
            ..SpecFilter::default()
        };

        let hits = filter_specs(&store, "ns01", &filter).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "aws-b-medium");
    }

    #[test]
    fn empty_filter_returns_every_row() {
        let store = seeded_store();
        let hits = filter_specs(&store, "ns01", &SpecFilter::default()).unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn zero_matches_is_success_not_error() {
        let store = seeded_store();
        let filter = SpecFilter {
            vcpu: NumRange { min: Some(128.0), max: None },
            ..SpecFilter::default()
        };
        assert!(filter_specs(&store, "ns01", &filter).unwrap().is_empty());
    }

    #[test]
    fn bad_namespace_is_validation() {
        let store = seeded_store();
        assert!(matches!(
            filter_specs(&store, "-bad", &SpecFilter::default()),
            Err(Error::Validation(_))
        ));
    }
}
