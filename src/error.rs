// error.rs - Scan engine error taxonomy
// Purpose: Separate errors local to one probe from errors about the target itself

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScanError>;

#[derive(Error, Debug)]
pub enum ScanError {
    // === Probe-local errors (recovered inside enumerations) ===
    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    // === Target-fatal errors ===
    #[error("{target} does not appear to be running {cms}: {reason}")]
    NotThisCms {
        target: String,
        cms: String,
        reason: String,
    },

    #[error("Too many redirects while detecting scanning method for {target} (last Location: {location})")]
    RedirectLimitExceeded { target: String, location: String },

    // === Input errors ===
    #[error("Invalid target URL '{url}': {reason}")]
    InvalidTarget { url: String, reason: String },

    #[error("Malformed entry on line {line}: '{entry}' ({reason})")]
    MalformedInputEntry {
        line: usize,
        entry: String,
        reason: String,
    },

    #[error("Invalid base URL template '{template}': expected exactly two '%s' slots")]
    InvalidTemplate { template: String },

    #[error("Cannot read wordlist {path}: {source}")]
    Wordlist {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid version corpus: {0}")]
    Corpus(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl ScanError {
    /// Errors about the target's fundamental nature abort the whole scan of that target.
    pub fn is_fatal_for_target(&self) -> bool {
        matches!(
            self,
            ScanError::NotThisCms { .. } | ScanError::RedirectLimitExceeded { .. }
        )
    }
}
