use std::fmt;

/// Failure taxonomy for the crawl batch.
///
/// Scoring has no variant here: the scorer is total over its domain and
/// cannot fail. Per-language failures are isolated by the batch driver;
/// `Notification` never aborts anything.
#[derive(Debug)]
pub enum TrackerError {
    /// Network or HTTP failure while fetching a trending page.
    Fetch { url: String, message: String },
    /// The page markup no longer matches the expected trending layout:
    /// extraction produced zero valid records from non-empty input.
    LayoutDrift { url: String },
    /// Database failure; the surrounding transaction has been rolled back.
    Persistence(String),
    /// Report delivery failure; logged by the caller, never fatal.
    Notification(String),
}

impl TrackerError {
    pub fn fetch(url: impl Into<String>, message: impl Into<String>) -> Self {
        TrackerError::Fetch {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn layout_drift(url: impl Into<String>) -> Self {
        TrackerError::LayoutDrift { url: url.into() }
    }

    pub fn notification(message: impl Into<String>) -> Self {
        TrackerError::Notification(message.into())
    }

    pub fn is_layout_drift(&self) -> bool {
        matches!(self, TrackerError::LayoutDrift { .. })
    }
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerError::Fetch { url, message } => {
                write!(f, "fetch failed for {}: {}", url, message)
            }
            TrackerError::LayoutDrift { url } => {
                write!(f, "trending page layout drift at {}: no valid entries extracted", url)
            }
            TrackerError::Persistence(message) => write!(f, "persistence error: {}", message),
            TrackerError::Notification(message) => write!(f, "notification error: {}", message),
        }
    }
}

impl std::error::Error for TrackerError {}

impl From<rusqlite::Error> for TrackerError {
    fn from(e: rusqlite::Error) -> Self {
        TrackerError::Persistence(e.to_string())
    }
}
