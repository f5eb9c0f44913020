//! Live session data from the OpenF1 API.

use crate::client::{create_http_client, send_json};
use crate::config::{LiveDataSettings, ProviderSettings};
use crate::error::{PitwallError, Result, Stage};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Phrases that mark a question as being about the current session.
pub const LIVE_DATA_KEYWORDS: &[&str] = &[
    "current session",
    "live",
    "right now",
    "today's race",
    "qualifying results",
    "practice results",
    "current position",
    "latest lap",
    "weather at",
    "track temperature",
    "current standings today",
    "position right now",
];

/// Most positions listed in the live context.
const MAX_POSITIONS: usize = 20;

/// Whether a question asks for live session data.
pub fn needs_live_data(question: &str) -> bool {
    let question = question.to_lowercase();
    LIVE_DATA_KEYWORDS.iter().any(|kw| question.contains(kw))
}

/// A source of real-time session information.
#[async_trait]
pub trait LiveDataSource: Send + Sync {
    /// Plain-text summary of the current session, ready for a prompt.
    async fn live_context(&self) -> Result<String>;
}

/// Client for the OpenF1 API, always asking about the latest session.
pub struct OpenF1Client {
    client: reqwest::Client,
    base_url: String,
    max_retries: usize,
}

impl OpenF1Client {
    pub fn new(settings: &LiveDataSettings, providers: &ProviderSettings) -> Result<Self> {
        let client = create_http_client(Duration::from_secs(settings.timeout_secs))?;
        Ok(Self::with_client(client, &settings.openf1_base_url, providers.max_retries))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str, max_retries: usize) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries,
        }
    }

    async fn latest<T: DeserializeOwned>(&self, endpoint: &str) -> Result<Vec<T>> {
        let request = self
            .client
            .get(format!("{}/{}", self.base_url, endpoint))
            .query(&[("session_key", "latest")]);
        send_json(request, self.max_retries, Stage::LiveData, endpoint).await
    }

    /// Fetch every endpoint. A failing endpoint only leaves its part empty.
    async fn snapshot(&self) -> LiveSnapshot {
        let (sessions, drivers, positions, weather) = tokio::join!(
            self.latest::<Session>("sessions"),
            self.latest::<Driver>("drivers"),
            self.latest::<Position>("position"),
            self.latest::<Weather>("weather"),
        );

        LiveSnapshot {
            session: or_empty("sessions", sessions).into_iter().next(),
            drivers: or_empty("drivers", drivers),
            positions: or_empty("position", positions),
            weather: or_empty("weather", weather).pop(),
        }
    }
}

fn or_empty<T>(endpoint: &str, result: Result<Vec<T>>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        warn!(endpoint, "OpenF1 request failed: {}", e);
        Vec::new()
    })
}

#[async_trait]
impl LiveDataSource for OpenF1Client {
    #[instrument(skip(self))]
    async fn live_context(&self) -> Result<String> {
        let snapshot = self.snapshot().await;
        let context = snapshot.render().ok_or_else(|| {
            PitwallError::unavailable(Stage::LiveData, "no live F1 session data is available")
        })?;
        debug!("Live context: {} chars", context.len());
        Ok(context)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Session {
    #[serde(default)]
    session_name: Option<String>,
    #[serde(default)]
    session_type: Option<String>,
    #[serde(default)]
    circuit_short_name: Option<String>,
    #[serde(default)]
    country_name: Option<String>,
    #[serde(default)]
    year: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
struct Driver {
    driver_number: u32,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    team_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Position {
    driver_number: u32,
    position: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct Weather {
    #[serde(default)]
    air_temperature: Option<f64>,
    #[serde(default)]
    track_temperature: Option<f64>,
    #[serde(default)]
    humidity: Option<f64>,
    #[serde(default)]
    rainfall: Option<f64>,
    #[serde(default)]
    wind_speed: Option<f64>,
}

#[derive(Debug, Default)]
struct LiveSnapshot {
    session: Option<Session>,
    drivers: Vec<Driver>,
    /// Chronological; later entries supersede earlier ones per driver.
    positions: Vec<Position>,
    weather: Option<Weather>,
}

impl LiveSnapshot {
    fn render(&self) -> Option<String> {
        let mut parts = Vec::new();

        if let Some(session) = &self.session {
            let unknown = || "Unknown".to_string();
            parts.push(format!(
                "Latest F1 Session: {} ({}) at {}, {} ({})",
                session.session_name.clone().unwrap_or_else(unknown),
                session.session_type.clone().unwrap_or_else(unknown),
                session.circuit_short_name.clone().unwrap_or_else(unknown),
                session.country_name.clone().unwrap_or_else(unknown),
                session.year.map(|y| y.to_string()).unwrap_or_else(unknown),
            ));
        }

        // First entry per number wins
        let mut names: BTreeMap<u32, &Driver> = BTreeMap::new();
        for driver in &self.drivers {
            names.entry(driver.driver_number).or_insert(driver);
        }

        if !names.is_empty() {
            let mut lines = vec!["Drivers in Current Session:".to_string()];
            for driver in names.values() {
                lines.push(format!(
                    "  #{} {} - {}",
                    driver.driver_number,
                    driver.full_name.as_deref().unwrap_or("Unknown"),
                    driver.team_name.as_deref().unwrap_or("Unknown"),
                ));
            }
            parts.push(lines.join("\n"));
        }

        let mut latest: BTreeMap<u32, u32> = BTreeMap::new();
        for entry in &self.positions {
            latest.insert(entry.driver_number, entry.position);
        }

        if !latest.is_empty() {
            let mut order: Vec<(u32, u32)> = latest.into_iter().collect();
            order.sort_by_key(|&(number, position)| (position, number));

            let mut lines = vec!["Current Session Positions:".to_string()];
            for (number, position) in order.into_iter().take(MAX_POSITIONS) {
                let name = names
                    .get(&number)
                    .and_then(|d| d.full_name.clone())
                    .unwrap_or_else(|| format!("Driver #{}", number));
                lines.push(format!("  P{}: {} (#{})", position, name, number));
            }
            parts.push(lines.join("\n"));
        }

        if let Some(weather) = &self.weather {
            let value = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_else(|| "N/A".to_string());
            parts.push(format!(
                "Current Track Weather:\n  Air Temperature: {}°C\n  Track Temperature: {}°C\n  \
                 Humidity: {}%\n  Rainfall: {}\n  Wind Speed: {} m/s",
                value(weather.air_temperature),
                value(weather.track_temperature),
                value(weather.humidity),
                if weather.rainfall.unwrap_or(0.0) > 0.0 { "Yes" } else { "No" },
                value(weather.wind_speed),
            ));
        }

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_live_data() {
        assert!(needs_live_data("Who is leading RIGHT NOW?"));
        assert!(needs_live_data("What is the track temperature in Monza?"));
        assert!(needs_live_data("Show me the qualifying results"));
        assert!(!needs_live_data("Who won the 2008 championship?"));
    }

    #[test]
    fn test_render_full_snapshot() {
        let session: Vec<Session> = serde_json::from_str(
            r#"[{"session_key": 9158, "session_name": "Race", "session_type": "Race",
                "circuit_short_name": "Monza", "country_name": "Italy", "year": 2025}]"#,
        )
        .unwrap();
        let drivers: Vec<Driver> = serde_json::from_str(
            r#"[{"driver_number": 4, "full_name": "Lando NORRIS", "team_name": "McLaren"},
                {"driver_number": 1, "full_name": "Max VERSTAPPEN", "team_name": "Red Bull Racing"},
                {"driver_number": 4, "full_name": "Duplicate", "team_name": "McLaren"}]"#,
        )
        .unwrap();
        let positions: Vec<Position> = serde_json::from_str(
            r#"[{"driver_number": 4, "position": 1, "date": "2025-09-07T13:00:00"},
                {"driver_number": 1, "position": 2, "date": "2025-09-07T13:00:00"},
                {"driver_number": 1, "position": 1, "date": "2025-09-07T13:40:00"},
                {"driver_number": 4, "position": 2, "date": "2025-09-07T13:40:00"}]"#,
        )
        .unwrap();
        let weather: Vec<Weather> = serde_json::from_str(
            r#"[{"air_temperature": 24.5, "track_temperature": 41.0, "humidity": 40.0,
                 "rainfall": 0, "wind_speed": 1.2}]"#,
        )
        .unwrap();

        let snapshot = LiveSnapshot {
            session: session.into_iter().next(),
            drivers,
            positions,
            weather: weather.into_iter().next(),
        };
        let text = snapshot.render().unwrap();

        assert!(text.starts_with("Latest F1 Session: Race (Race) at Monza, Italy (2025)"));
        assert!(text.contains("#4 Lando NORRIS - McLaren"));
        assert!(!text.contains("Duplicate"));
        let p1 = text.find("P1: Max VERSTAPPEN (#1)").unwrap();
        let p2 = text.find("P2: Lando NORRIS (#4)").unwrap();
        assert!(p1 < p2);
        assert!(text.contains("Track Temperature: 41°C"));
        assert!(text.contains("Rainfall: No"));
    }

    #[test]
    fn test_render_positions_without_drivers() {
        let snapshot = LiveSnapshot {
            positions: vec![Position {
                driver_number: 44,
                position: 3,
            }],
            ..Default::default()
        };
        assert_eq!(
            snapshot.render().unwrap(),
            "Current Session Positions:\n  P3: Driver #44 (#44)"
        );
    }

    #[test]
    fn test_render_empty_snapshot() {
        assert_eq!(LiveSnapshot::default().render(), None);
    }
}
