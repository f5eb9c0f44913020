//! Fixed-size sliding window over a document's characters.

use super::{Chunk, ChunkingConfig, Tagger};

/// Splits text into overlapping windows of `chunk_size` characters.
pub struct WindowChunker {
    config: ChunkingConfig,
    tagger: Tagger,
}

impl WindowChunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self {
            config,
            tagger: Tagger::new(),
        }
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Lazily cut `text` into chunks. Each call starts from the beginning.
    pub fn chunks<'a>(&'a self, source_id: &'a str, text: &'a str) -> Chunks<'a> {
        Chunks {
            chunker: self,
            source_id,
            text,
            len: text.chars().count(),
            start_char: 0,
            start_byte: 0,
            index: 0,
            done: false,
        }
    }

    /// Convenience for collecting every chunk of a document.
    pub fn chunk(&self, source_id: &str, text: &str) -> Vec<Chunk> {
        self.chunks(source_id, text).collect()
    }
}

/// Iterator over the windows of a single document.
#[derive(Clone)]
pub struct Chunks<'a> {
    chunker: &'a WindowChunker,
    source_id: &'a str,
    text: &'a str,
    /// Text length in characters.
    len: usize,
    start_char: usize,
    start_byte: usize,
    index: usize,
    done: bool,
}

impl Chunks<'_> {
    /// Byte offset reached after stepping `n` characters forward from `from`.
    fn advance(&self, from: usize, n: usize) -> usize {
        self.text[from..]
            .char_indices()
            .nth(n)
            .map(|(i, _)| from + i)
            .unwrap_or(self.text.len())
    }
}

impl Iterator for Chunks<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.done || self.start_char >= self.len {
            return None;
        }

        let config = self.chunker.config;
        let end_char = (self.start_char + config.chunk_size()).min(self.len);
        let end_byte = self.advance(self.start_byte, end_char - self.start_char);
        let text = &self.text[self.start_byte..end_byte];

        let chunk = Chunk {
            text: text.to_string(),
            source_id: self.source_id.to_string(),
            sequence_index: self.index,
            char_start: self.start_char,
            char_end: end_char,
            overlap_with_previous: if self.index == 0 { 0 } else { config.overlap() },
            tags: self.chunker.tagger.tag(text),
        };

        // Stop once a window reaches the end; later windows would be suffixes of it
        if end_char == self.len {
            self.done = true;
        } else {
            self.start_byte = self.advance(self.start_byte, config.stride());
            self.start_char += config.stride();
        }
        self.index += 1;

        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        let config = self.chunker.config;
        let total = config.chunk_count(self.len);
        let remaining = total.saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Chunks<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(size: usize, overlap: usize) -> WindowChunker {
        WindowChunker::new(ChunkingConfig::new(size, overlap).unwrap())
    }

    #[test]
    fn test_sliding_windows() {
        let chunker = chunker(4, 2);
        let chunks = chunker.chunk("doc", "ABCDEFGHIJ");

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["ABCD", "CDEF", "EFGH", "GHIJ"]);

        assert_eq!(chunks[0].char_start, 0);
        assert_eq!(chunks[3].char_start, 6);
        assert_eq!(chunks[3].char_end, 10);
        assert_eq!(chunks[0].overlap_with_previous, 0);
        assert!(chunks[1..].iter().all(|c| c.overlap_with_previous == 2));
        assert!(chunks.iter().enumerate().all(|(i, c)| c.sequence_index == i));
        assert!(chunks.iter().all(|c| c.source_id == "doc"));
    }

    #[test]
    fn test_short_final_window() {
        let chunker = chunker(4, 2);
        let chunks = chunker.chunk("doc", "ABCDEFGHIJK");

        assert_eq!(chunks.len(), 5);
        assert_eq!(chunks[4].text, "IJK");
        assert_eq!(chunks[4].char_len(), 3);
    }

    #[test]
    fn test_empty_and_short_text() {
        let chunker = chunker(800, 200);
        assert_eq!(chunker.chunks("doc", "").count(), 0);

        let chunks = chunker.chunk("doc", "Monza is the Temple of Speed.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Monza is the Temple of Speed.");
        assert_eq!(chunks[0].overlap_with_previous, 0);
    }

    #[test]
    fn test_count_matches_config() {
        let chunker = chunker(50, 15);
        for len in [1, 49, 50, 51, 85, 86, 500, 1234] {
            let text = "x".repeat(len);
            let chunks = chunker.chunk("doc", &text);
            assert_eq!(chunks.len(), chunker.config().chunk_count(len), "len={}", len);
            assert!(chunks.iter().all(|c| c.char_len() <= 50));
            assert_eq!(chunks.last().unwrap().char_end, len);
        }
    }

    #[test]
    fn test_consecutive_windows_share_overlap() {
        let chunker = chunker(10, 3);
        let text = "The 2026 cars use active aerodynamics and a new power unit.";
        let chunks = chunker.chunk("doc", text);

        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].text.chars().collect();
            let next: Vec<char> = pair[1].text.chars().collect();
            assert_eq!(prev[prev.len() - 3..], next[..3]);
        }
    }

    #[test]
    fn test_multibyte_text_is_cut_on_char_boundaries() {
        let chunker = chunker(3, 1);
        let chunks = chunker.chunk("doc", "Räikkönen–Hülkenberg");

        let rebuilt: String = chunks
            .iter()
            .enumerate()
            .map(|(i, c)| {
                if i == 0 {
                    c.text.clone()
                } else {
                    c.text.chars().skip(1).collect()
                }
            })
            .collect();
        assert_eq!(rebuilt, "Räikkönen–Hülkenberg");
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 3));
    }

    #[test]
    fn test_iteration_is_restartable() {
        let chunker = chunker(4, 2);
        let mut iter = chunker.chunks("doc", "ABCDEFGHIJ");
        assert_eq!(iter.len(), 4);

        iter.next();
        let snapshot = iter.clone();
        assert_eq!(iter.count(), 3);
        assert_eq!(snapshot.count(), 3);

        let again: Vec<Chunk> = chunker.chunks("doc", "ABCDEFGHIJ").collect();
        assert_eq!(again, chunker.chunk("doc", "ABCDEFGHIJ"));
    }

    #[test]
    fn test_chunks_are_tagged() {
        let chunker = chunker(800, 200);
        let chunks = chunker.chunk("doc", "Leclerc drove for Ferrari in the 2019 season.");
        let tags = &chunks[0].tags;
        assert_eq!(tags.driver.as_deref(), Some("leclerc"));
        assert_eq!(tags.team.as_deref(), Some("ferrari"));
        assert_eq!(tags.season, Some(2019));
    }
}
