use thiserror::Error;

/// Failures of the parse → model → render pipeline.
#[derive(Debug, Error)]
pub enum VizError {
    /// Malformed data line in the observations file.
    #[error("line {line}: {reason}: {text:?}")]
    Parse {
        line: usize,
        reason: String,
        text: String,
    },

    /// Input that is well-formed but cannot be plotted.
    #[error("invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("image encoding error: {0}")]
    Image(#[from] image::ImageError),
}

impl VizError {
    pub fn parse(line: usize, reason: impl Into<String>, text: &str) -> Self {
        VizError::Parse {
            line,
            reason: reason.into(),
            text: text.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        VizError::Validation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, VizError>;
