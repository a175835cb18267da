//! # datwatch Analytics
//!
//! Price-performance calculation around a DAT announcement date.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of price
//!   providers or files. It depends only on `core-types` (Layer 0).
//! - **Stateless Calculation:** `PerformanceCalculator` takes an anchor date and a
//!   `PriceSeries` and produces a `PerformanceReport`. Missing market data is a
//!   value (`None`), never an error.
//!
//! ## Public API
//!
//! - `resolve`: aligns a calendar date to the nearest sample in a given direction.
//! - `PerformanceCalculator`: computes the named performance windows.
//! - `PerformanceReport`: the per-instrument result, including integrity warnings.

// Declare the modules that constitute this crate.
pub mod align;
pub mod engine;
pub mod report;

// Re-export the key components to create a clean, public-facing API.
pub use align::resolve;
pub use engine::{PerformanceCalculator, PERCENT_SCALE};
pub use report::PerformanceReport;
