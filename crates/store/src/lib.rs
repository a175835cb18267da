//! # datwatch Store
//!
//! The file-system side of the pipeline: a folder of JSON fact cards, a folder
//! of price files, and the trash step that follows duplicate resolution.
//!
//! ## Architectural Principles
//!
//! - **Adapter:** everything that touches disk lives here. The enricher and the
//!   grouper stay pure and receive records and series by value or reference.
//! - **Seam implementation:** `FilePriceSource` is one `PriceSource`; a network
//!   provider would be another, with no change to the enricher.
//!
//! ## Public API
//!
//! - `CardStore`: loads `*.json` cards into `EventRecord`s and saves them in place.
//! - `FilePriceSource`: reads `<SYMBOL>.json` price files for the enricher.
//! - `apply_resolution`: moves or deletes discarded cards according to `TrashOptions`.
//! - `StoreError`: the specific error types that can be returned from this crate.

pub mod cards;
pub mod error;
pub mod prices;
pub mod trash;

pub use cards::{CardStore, LoadedBatch, StoredCard};
pub use error::StoreError;
pub use prices::FilePriceSource;
pub use trash::{apply_resolution, TrashAction, TrashOptions};
