//! Resume positions for pp
//!
//! Positions are kept as a flat JSON object mapping a file path to the
//! number of seconds watched, e.g. `{"/videos/a.mp4": 123.45}`.

use crate::utils::error::Result;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Positions closer than this to the start are not worth remembering
const MIN_RESUME_SECS: f64 = 0.5;

/// Fraction of the duration after which a video counts as finished
const FINISHED_FRACTION: f64 = 0.95;

/// Per-file resume positions backed by a JSON file
#[derive(Debug)]
pub struct ResumeStore {
    /// Backing file
    path: PathBuf,

    /// Map of file path to last position in seconds
    positions: HashMap<String, f64>,
}

impl ResumeStore {
    /// Create an empty store that will save to `path`
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            positions: HashMap::new(),
        }
    }

    /// Load positions from disk; a missing or corrupt file yields an empty store
    pub fn load(path: PathBuf) -> Self {
        let positions = match std::fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str::<HashMap<String, f64>>(&data) {
                Ok(positions) => {
                    debug!("Loaded {} resume positions from {}", positions.len(), path.display());
                    positions
                }
                Err(e) => {
                    warn!("Ignoring unreadable resume file {}: {}", path.display(), e);
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No resume file at {}, starting fresh", path.display());
                HashMap::new()
            }
            Err(e) => {
                warn!("Cannot read resume file {}: {}", path.display(), e);
                HashMap::new()
            }
        };

        Self { path, positions }
    }

    /// Write all positions to disk
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let data = serde_json::to_string_pretty(&self.positions)?;
        std::fs::write(&self.path, data)?;

        info!("Saved {} resume positions", self.positions.len());
        Ok(())
    }

    /// Saved position for a file, if any
    pub fn get(&self, file: &Path) -> Option<Duration> {
        self.positions
            .get(&Self::key(file))
            .copied()
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(Duration::from_secs_f64)
    }

    /// Remember how far a file was watched
    ///
    /// Positions near the very start or past the finish mark drop the entry,
    /// so the next open starts from the beginning.
    pub fn record(&mut self, file: &Path, position: Duration, duration: Duration) {
        let secs = position.as_secs_f64();
        let total = duration.as_secs_f64();
        let key = Self::key(file);

        if secs < MIN_RESUME_SECS || (total > 0.0 && secs >= total * FINISHED_FRACTION) {
            if self.positions.remove(&key).is_some() {
                debug!("Cleared resume position for {}", key);
            }
            return;
        }

        debug!("Resume position for {}: {:.2}s", key, secs);
        self.positions.insert(key, secs);
    }

    /// Drop the saved position for a file
    pub fn forget(&mut self, file: &Path) {
        self.positions.remove(&Self::key(file));
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn key(file: &Path) -> String {
        file.to_string_lossy().into_owned()
    }
}
