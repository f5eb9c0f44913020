//! Text chunking for the ingestion pipeline.
//!
//! Source documents are cut into fixed-size, overlapping character windows and
//! each window is tagged with the driver, team and season it mentions.

mod tags;
mod window;

pub use tags::{ChunkTags, Tagger, DRIVER_NAMES, TEAM_NAMES};
pub use window::{Chunks, WindowChunker};

use crate::config::ChunkingSettings;
use crate::error::{PitwallError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A window of source text, ready to be embedded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Text content of this window.
    pub text: String,
    /// Document this chunk was cut from (its URL for scraped sources).
    pub source_id: String,
    /// Position of this chunk in the document, from 0.
    pub sequence_index: usize,
    /// Start offset in characters, inclusive.
    pub char_start: usize,
    /// End offset in characters, exclusive.
    pub char_end: usize,
    /// Characters shared with the previous chunk (0 for the first).
    pub overlap_with_previous: usize,
    pub tags: ChunkTags,
}

impl Chunk {
    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.char_end - self.char_start
    }

    /// Flat metadata fields describing this chunk's position and tags.
    pub fn metadata(&self) -> Map<String, Value> {
        let mut meta = Map::new();
        meta.insert("sequence_index".into(), self.sequence_index.into());
        meta.insert("char_start".into(), self.char_start.into());
        meta.insert("char_end".into(), self.char_end.into());
        meta.insert(
            "overlap_with_previous".into(),
            self.overlap_with_previous.into(),
        );
        if let Some(driver) = &self.tags.driver {
            meta.insert("driver".into(), driver.clone().into());
        }
        if let Some(team) = &self.tags.team {
            meta.insert("team".into(), team.clone().into());
        }
        if let Some(season) = self.tags.season {
            meta.insert("season".into(), season.into());
        }
        meta
    }
}

/// Window geometry, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkingConfig {
    /// Requires `0 < overlap < chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 || overlap == 0 {
            return Err(PitwallError::InvalidConfiguration(format!(
                "chunk_size ({}) and overlap ({}) must both be positive",
                chunk_size, overlap
            )));
        }
        if overlap >= chunk_size {
            return Err(PitwallError::InvalidConfiguration(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn from_settings(settings: &ChunkingSettings) -> Result<Self> {
        Self::new(settings.chunk_size, settings.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance between consecutive window starts.
    pub fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }

    /// Number of chunks produced for a text of `len` characters.
    pub fn chunk_count(&self, len: usize) -> usize {
        match len {
            0 => 0,
            n if n <= self.chunk_size => 1,
            n => (n - self.overlap).div_ceil(self.stride()),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            overlap: 200,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_rejects_overlap_not_below_size() {
        assert!(ChunkingConfig::new(4, 4).is_err());
        assert!(ChunkingConfig::new(4, 5).is_err());
        assert!(ChunkingConfig::new(0, 0).is_err());
        assert!(ChunkingConfig::new(4, 0).is_err());

        let err = ChunkingConfig::new(10, 12).unwrap_err();
        assert_eq!(err.kind(), "invalid_configuration");
    }

    #[test]
    fn test_chunk_count_formula() {
        let config = ChunkingConfig::new(4, 2).unwrap();
        assert_eq!(config.chunk_count(0), 0);
        assert_eq!(config.chunk_count(3), 1);
        assert_eq!(config.chunk_count(4), 1);
        assert_eq!(config.chunk_count(10), 4);
        assert_eq!(config.chunk_count(11), 5);
    }

    #[test]
    fn test_metadata_includes_offsets_and_tags() {
        let chunk = Chunk {
            text: "Hamilton won for Mercedes in 2020".to_string(),
            source_id: "doc".to_string(),
            sequence_index: 2,
            char_start: 10,
            char_end: 43,
            overlap_with_previous: 5,
            tags: ChunkTags {
                driver: Some("hamilton".to_string()),
                team: Some("mercedes".to_string()),
                season: Some(2020),
            },
        };

        let meta = chunk.metadata();
        assert_eq!(meta["sequence_index"], 2);
        assert_eq!(meta["char_end"], 43);
        assert_eq!(meta["driver"], "hamilton");
        assert_eq!(meta["season"], 2020);
        assert_eq!(chunk.char_len(), 33);
    }
}
