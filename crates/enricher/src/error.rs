use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("Worker limit must be at least 1")]
    InvalidWorkerLimit,

    #[error("Failed to build the enrichment worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Errors reported by a `PriceSource` collaborator.
///
/// These never abort a batch: the affected record gets no series and a
/// `DataWarning::SourceFailed`.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("I/O error reading prices for {symbol}: {source}")]
    Io {
        symbol: String,
        source: std::io::Error,
    },

    #[error("Malformed price data for {symbol}: {reason}")]
    Malformed { symbol: String, reason: String },

    #[error("Symbol {0:?} cannot name a price file")]
    InvalidSymbol(String),

    #[error("Price provider error: {0}")]
    Provider(String),
}
