//! Spec catalog crawler and query engine.
//!
//! The crawler fans out over registered provider connections, pulls each
//! connection's full instance-type catalog through the driver, normalizes
//! every descriptor into a canonical [`stratus_state::SpecEntry`], and
//! upserts the rows. One unreachable provider never blocks the others; the
//! crawl returns a structured partial-success report.
//!
//! The filter engine turns a [`SpecFilter`] record into catalog predicates
//! through an explicit field-to-column binding table validated once at
//! startup.

mod crawler;
mod filter;

pub use crawler::{ConnectionFailure, CrawlReport, SpecCrawler, SpecRegisterReq, normalize_spec};
pub use filter::{NumRange, SpecFilter, filter_specs, validate_bindings};
