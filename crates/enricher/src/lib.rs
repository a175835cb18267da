//! # datwatch Enricher
//!
//! Attaches stock and token price performance to extracted DAT event records.
//!
//! `RecordEnricher` works on one record at a time and is pure: it is handed the
//! series a `PriceSource` collaborator fetched and never does I/O itself.
//! `enrich_batch` fans records out over a bounded rayon pool.

pub mod batch;
pub mod enricher;
pub mod error;
pub mod source;

pub use batch::{enrich_batch, EnrichmentJob};
pub use enricher::{EnrichOptions, EnrichmentOutcome, EnrichmentSummary, RecordEnricher, TokenAnchor};
pub use error::{EnrichError, SourceError};
pub use source::{prepare_jobs, DateWindow, PriceSource};
