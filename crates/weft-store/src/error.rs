//! Store-boundary errors.
//!
//! Nothing here is fatal to the application: run failures are captured into
//! the owning entity's `error` field and action failures route to the
//! chain's `on_failure` continuation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Script(#[from] weft_eval::EvalError),

    /// A run operation completed with an error captured on the entity.
    #[error("{0}")]
    Run(String),
}
