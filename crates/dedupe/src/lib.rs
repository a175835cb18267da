//! # datwatch Dedupe
//!
//! Decides which of several near-duplicate extracted records is the canonical
//! DAT event.
//!
//! ## Architectural Principles
//!
//! - **Classification only:** the grouper returns keep/discard verdicts with an
//!   audit trail. Moving or deleting the underlying files is the store's job.
//! - **Near-linear:** records are keyed through a hash map, never compared pairwise.
//! - **Caller-defined size:** `resolve` takes a `size_of` closure, so "largest"
//!   means whatever the caller measures.

pub mod grouper;
pub mod key;

pub use grouper::{
    partition, DedupeSummary, Discard, DuplicateGroup, DuplicateGrouper, GroupMember,
    ResolutionOutcome,
};
pub use key::IdentityKey;
