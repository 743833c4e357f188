use thiserror::Error;

/// Failures that abort a backup run.
///
/// These are raised inside `anyhow::Error` so callers can add context on the way up;
/// use `err.downcast_ref::<BackupError>()` to recover the kind.
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("unexpected HTTP status {status} from {url}: {body:?}")]
    Transport {
        url: String,
        status: u16,
        body: String,
    },

    #[error("unexpected page structure at `{field}`: {detail}")]
    Structure { field: String, detail: String },

    #[error(
        "gave up after {pages} page(s): collected {collected} of {declared} declared item(s)"
    )]
    PageLimit {
        pages: u32,
        collected: usize,
        declared: u64,
    },
}

impl BackupError {
    pub fn structure(field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Structure {
            field: field.into(),
            detail: detail.into(),
        }
    }
}
