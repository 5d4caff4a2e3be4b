/// Result alias that carries the custom [`RhythmError`] type.
pub type Result<T> = std::result::Result<T, RhythmError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum RhythmError {
    /// A chart record is missing a required field or carries an invalid
    /// value. `index` is the record position in the input, or `None` when
    /// the document as a whole could not be read.
    #[error("{}", chart_format_message(.index, .reason))]
    ChartFormat {
        index: Option<usize>,
        reason: String,
    },
    /// Session configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Free-form failure, e.g. a poisoned session lock.
    #[error("{0}")]
    Message(String),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl RhythmError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// Chart error tied to the record at `index`.
    pub fn chart_record<T: Into<String>>(index: usize, reason: T) -> Self {
        Self::ChartFormat {
            index: Some(index),
            reason: reason.into(),
        }
    }

    /// Chart error that applies to the whole document.
    pub fn chart_document<T: Into<String>>(reason: T) -> Self {
        Self::ChartFormat {
            index: None,
            reason: reason.into(),
        }
    }

    pub fn is_chart_format(&self) -> bool {
        matches!(self, Self::ChartFormat { .. })
    }
}

fn chart_format_message(index: &Option<usize>, reason: &str) -> String {
    match index {
        Some(index) => format!("malformed chart record #{index}: {reason}"),
        None => format!("malformed chart: {reason}"),
    }
}

impl From<&str> for RhythmError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for RhythmError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
