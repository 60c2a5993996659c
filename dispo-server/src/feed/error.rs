//! Feed error types.

use std::fmt;
use std::path::PathBuf;

use super::convert::ConversionError;

/// Errors from loading feed frames.
#[derive(Debug)]
pub enum FeedError {
    /// Reading a file or directory failed
    Io { path: PathBuf, source: std::io::Error },

    /// A frame file is not valid JSON for a frame
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A frame parsed but could not be converted
    Conversion {
        path: PathBuf,
        source: ConversionError,
    },

    /// The directory contains no frame files
    Empty(PathBuf),
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::Io { path, source } => write!(f, "cannot read {}: {source}", path.display()),
            FeedError::Json { path, source } => {
                write!(f, "invalid frame {}: {source}", path.display())
            }
            FeedError::Conversion { path, source } => {
                write!(f, "cannot convert frame {}: {source}", path.display())
            }
            FeedError::Empty(path) => write!(f, "no frame files in {}", path.display()),
        }
    }
}

impl std::error::Error for FeedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FeedError::Io { source, .. } => Some(source),
            FeedError::Json { source, .. } => Some(source),
            FeedError::Conversion { source, .. } => Some(source),
            FeedError::Empty(_) => None,
        }
    }
}
