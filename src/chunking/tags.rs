//! Driver, team and season detection for chunk metadata.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Known driver surnames, lowercase.
pub const DRIVER_NAMES: &[&str] = &[
    "verstappen", "hamilton", "leclerc", "norris", "sainz", "piastri", "russell", "alonso",
    "stroll", "gasly", "ocon", "tsunoda", "ricciardo", "hulkenberg", "magnussen", "bottas",
    "zhou", "albon", "sargeant", "lawson", "bearman", "colapinto", "antonelli", "hadjar",
    "bortoleto", "schumacher", "senna", "prost", "lauda", "vettel", "raikkonen", "hakkinen",
    "fangio", "clark", "hill", "mansell", "piquet",
];

/// Known constructor names, lowercase.
pub const TEAM_NAMES: &[&str] = &[
    "red bull", "mercedes", "ferrari", "mclaren", "aston martin", "alpine", "williams", "haas",
    "racing bulls", "kick sauber", "sauber", "alfa romeo", "alphatauri", "renault",
    "racing point", "toro rosso", "cadillac", "audi",
];

/// Tags attached to a chunk. Each is the first match found, or unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkTags {
    pub driver: Option<String>,
    pub team: Option<String>,
    pub season: Option<u16>,
}

/// Scans chunk text for known names and season years.
pub struct Tagger {
    season_regex: Regex,
}

impl Tagger {
    pub fn new() -> Self {
        // Championship years 1950-2049 standing alone as a word
        let season_regex = Regex::new(r"\b(19[5-9]\d|20[0-4]\d)\b").expect("Invalid regex");
        Self { season_regex }
    }

    /// Tag a chunk of text.
    pub fn tag(&self, text: &str) -> ChunkTags {
        let lower = text.to_lowercase();

        ChunkTags {
            driver: earliest_match(&lower, DRIVER_NAMES).map(str::to_string),
            team: earliest_match(&lower, TEAM_NAMES).map(str::to_string),
            season: self
                .season_regex
                .captures(text)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse().ok()),
        }
    }
}

impl Default for Tagger {
    fn default() -> Self {
        Self::new()
    }
}

/// The name occurring earliest in `haystack`; ties go to the earlier list entry.
fn earliest_match(haystack: &str, names: &[&'static str]) -> Option<&'static str> {
    names
        .iter()
        .filter_map(|name| haystack.find(name).map(|pos| (pos, *name)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, name)| name)
}
