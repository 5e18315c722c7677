use thiserror::Error;

/// Error taxonomy for the ingestion pipeline. Every kind has an explicit
/// handling policy: fetch failures empty out the unit they belong to,
/// delivery failures are retried then dropped for the run, store failures
/// skip the tenant at query time and are fatal at startup. Parse failures
/// never surface here; a malformed page degrades to an empty one at the
/// parsing site.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Keyword store error: {0}")]
    Store(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
