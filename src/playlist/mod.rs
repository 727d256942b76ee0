//! Playlist building for pp
//!
//! A playlist is the alphabetically sorted list of video files found in a
//! single directory. Opening a file plays its siblings too, starting at the
//! file that was asked for.

use crate::utils::error::{PlayerError, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions treated as playable video
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mkv", "mov", "wmv", "flv", "webm", "m4v",
];

/// Ordered list of video files with a cursor
#[derive(Debug, Clone)]
pub struct Playlist {
    /// Directory the entries were read from
    directory: PathBuf,

    /// Sorted video paths
    entries: Vec<PathBuf>,

    /// Index of the entry being played
    current: usize,
}

/// Check whether a path has one of the supported video extensions
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .map_or(false, |ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
}

impl Playlist {
    /// Build a playlist from a file or directory path
    pub fn scan(path: &Path) -> Result<Self> {
        let directory = if path.is_file() {
            match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            }
        } else {
            path.to_path_buf()
        };

        if !directory.is_dir() {
            return Err(PlayerError::NotFound(directory));
        }
        // Resume keys are entry paths, so they must not depend on the working directory
        let directory = directory
            .canonicalize()
            .map_err(|_| PlayerError::NotFound(directory.clone()))?;

        let mut entries: Vec<PathBuf> = WalkDir::new(&directory)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|entry| entry.into_path())
            .filter(|p| p.is_file() && is_video_file(p))
            .collect();

        entries.sort();

        if entries.is_empty() {
            return Err(PlayerError::NoMedia(directory));
        }

        let current = if path.is_file() {
            path.file_name()
                .and_then(|name| entries.iter().position(|e| e.file_name() == Some(name)))
                .unwrap_or(0)
        } else {
            0
        };

        info!("Found {} video files in {}", entries.len(), directory.display());
        debug!("Starting at {}", entries[current].display());

        Ok(Self {
            directory,
            entries,
            current,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> &Path {
        &self.entries[self.current]
    }

    pub fn get(&self, index: usize) -> Option<&Path> {
        self.entries.get(index).map(PathBuf::as_path)
    }

    /// Move the cursor; out of range indices are rejected
    pub fn select(&mut self, index: usize) -> Result<&Path> {
        if index >= self.entries.len() {
            return Err(PlayerError::InvalidInput(format!(
                "Playlist index {} out of range (len {})",
                index,
                self.entries.len()
            )));
        }
        self.current = index;
        Ok(&self.entries[index])
    }

    /// Index after the current one, wrapping to the start
    pub fn next_index(&self) -> usize {
        (self.current + 1) % self.entries.len()
    }

    /// Index before the current one, wrapping to the end
    pub fn prev_index(&self) -> usize {
        (self.current + self.entries.len() - 1) % self.entries.len()
    }

    /// 1-based "i/n" label for titles and status messages
    pub fn position_label(&self) -> String {
        format!("{}/{}", self.current + 1, self.entries.len())
    }
}
