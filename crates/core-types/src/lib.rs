pub mod enums;
pub mod error;
pub mod record;
pub mod structs;
pub mod warning;

// Re-export the core types to provide a clean public API.
pub use enums::{
    AssetClass, Direction, EnrichmentMode, MergePolicy, MetricKind, ResolutionPolicy,
    TokenAnchorFallback,
};
pub use error::CoreError;
pub use record::{EventRecord, FieldValue, RecordTag};
pub use structs::{PriceSample, PriceSeries};
pub use warning::DataWarning;
