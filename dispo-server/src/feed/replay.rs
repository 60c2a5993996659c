//! File-backed feed that replays recorded frames.
//!
//! Loads every `*.json` file from a directory, sorted by file name, and
//! hands the converted frames out one at a time. Useful for development and
//! testing without a running simulator.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::Frame;

use super::convert::convert_frame;
use super::error::FeedError;
use super::types::FeedFrameDto;

/// Recorded frames, replayed in file-name order.
#[derive(Debug, Clone)]
pub struct ReplayFeed {
    frames: VecDeque<Frame>,
}

impl ReplayFeed {
    /// Load all frame files from `data_dir`.
    ///
    /// Fails if the directory cannot be read, if any frame file is invalid,
    /// or if there are no frame files at all.
    pub fn load(data_dir: impl AsRef<Path>) -> Result<Self, FeedError> {
        let data_dir = data_dir.as_ref();

        let entries = std::fs::read_dir(data_dir).map_err(|source| FeedError::Io {
            path: data_dir.to_path_buf(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| FeedError::Io {
                path: data_dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            return Err(FeedError::Empty(data_dir.to_path_buf()));
        }

        let mut frames = VecDeque::with_capacity(paths.len());
        for path in paths {
            frames.push_back(load_frame(&path)?);
        }

        debug!(frames = frames.len(), dir = %data_dir.display(), "loaded replay feed");
        Ok(Self { frames })
    }

    /// Build a feed from frames already in memory.
    pub fn from_frames(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    /// Number of frames left.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns true if every frame has been handed out.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl Iterator for ReplayFeed {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        self.frames.pop_front()
    }
}

fn load_frame(path: &Path) -> Result<Frame, FeedError> {
    let json = std::fs::read_to_string(path).map_err(|source| FeedError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let dto: FeedFrameDto = serde_json::from_str(&json).map_err(|source| FeedError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    convert_frame(&dto).map_err(|source| FeedError::Conversion {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn replays_in_file_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "002.json", r#"{"sim_time": "10:01"}"#);
        write(dir.path(), "001.json", r#"{"sim_time": "10:00"}"#);
        write(dir.path(), "notes.txt", "ignored");

        let mut feed = ReplayFeed::load(dir.path()).unwrap();
        assert_eq!(feed.len(), 2);

        assert_eq!(feed.next().unwrap().sim_time.to_string(), "10:00");
        assert_eq!(feed.next().unwrap().sim_time.to_string(), "10:01");
        assert!(feed.next().is_none());
        assert!(feed.is_empty());
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ReplayFeed::load(dir.path()).unwrap_err();
        assert!(matches!(err, FeedError::Empty(_)));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ReplayFeed::load(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, FeedError::Io { .. }));
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "001.json", "{not json");
        let err = ReplayFeed::load(dir.path()).unwrap_err();
        assert!(matches!(err, FeedError::Json { .. }));
    }

    #[test]
    fn bad_clock_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "001.json", r#"{"sim_time": "noon"}"#);
        let err = ReplayFeed::load(dir.path()).unwrap_err();
        assert!(matches!(err, FeedError::Conversion { .. }));
    }
}
