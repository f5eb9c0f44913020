//! Historical results from the Ergast-compatible Jolpica API, rendered as
//! plain-text documents.

use super::{Collected, DocumentSource, RawDocument};
use crate::client::send_json;
use crate::error::{Result, Stage};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Rows per page requested from the API (its maximum).
const PAGE_LIMIT: usize = 100;
const MAX_PAGES: usize = 20;

/// Top finishers listed per race.
const RESULTS_PER_RACE: usize = 10;

/// One per-season Ergast endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErgastDataset {
    RaceResults,
    DriverStandings,
    ConstructorStandings,
    Drivers,
    Constructors,
    Circuits,
}

impl ErgastDataset {
    pub const ALL: [ErgastDataset; 6] = [
        ErgastDataset::RaceResults,
        ErgastDataset::DriverStandings,
        ErgastDataset::ConstructorStandings,
        ErgastDataset::Drivers,
        ErgastDataset::Constructors,
        ErgastDataset::Circuits,
    ];

    /// Path below the season, without the `.json` suffix.
    pub fn endpoint(&self) -> &'static str {
        match self {
            ErgastDataset::RaceResults => "results",
            ErgastDataset::DriverStandings => "driverStandings",
            ErgastDataset::ConstructorStandings => "constructorStandings",
            ErgastDataset::Drivers => "drivers",
            ErgastDataset::Constructors => "constructors",
            ErgastDataset::Circuits => "circuits",
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            ErgastDataset::RaceResults => "race_results",
            ErgastDataset::DriverStandings | ErgastDataset::ConstructorStandings => "standings",
            ErgastDataset::Drivers => "drivers",
            ErgastDataset::Constructors => "constructors",
            ErgastDataset::Circuits => "circuits",
        }
    }

    pub fn namespace(&self) -> &'static str {
        match self {
            ErgastDataset::RaceResults
            | ErgastDataset::DriverStandings
            | ErgastDataset::ConstructorStandings => "ergast-results",
            ErgastDataset::Drivers => "ergast-drivers",
            ErgastDataset::Constructors => "ergast-constructors",
            ErgastDataset::Circuits => "ergast-circuits",
        }
    }

    fn priority(&self) -> u8 {
        match self {
            ErgastDataset::RaceResults
            | ErgastDataset::DriverStandings
            | ErgastDataset::ConstructorStandings => 1,
            _ => 2,
        }
    }

    fn title(&self, year: u16) -> String {
        match self {
            ErgastDataset::RaceResults => format!("{} Season Race Results", year),
            ErgastDataset::DriverStandings => format!("{} Drivers Championship", year),
            ErgastDataset::ConstructorStandings => format!("{} Constructors Championship", year),
            ErgastDataset::Drivers => format!("{} Drivers Info", year),
            ErgastDataset::Constructors => format!("{} Constructors Info", year),
            ErgastDataset::Circuits => format!("{} Circuits", year),
        }
    }

    /// Render the document body, or `None` when the season has no data.
    fn render(&self, year: u16, data: &MrData) -> Option<String> {
        match self {
            ErgastDataset::RaceResults => render_race_results(year, data),
            ErgastDataset::DriverStandings => render_driver_standings(year, data),
            ErgastDataset::ConstructorStandings => render_constructor_standings(year, data),
            ErgastDataset::Drivers => render_drivers(year, data),
            ErgastDataset::Constructors => render_constructors(year, data),
            ErgastDataset::Circuits => render_circuits(year, data),
        }
    }
}

impl std::fmt::Display for ErgastDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.endpoint())
    }
}

/// Collects the configured datasets for each configured season.
pub struct ErgastSource {
    client: reqwest::Client,
    base_url: String,
    years: Vec<u16>,
    datasets: Vec<ErgastDataset>,
    delay: Duration,
    retries: usize,
}

impl ErgastSource {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        years: Vec<u16>,
        datasets: Vec<ErgastDataset>,
        delay: Duration,
        retries: usize,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            years,
            datasets,
            delay,
            retries,
        }
    }

    fn url(&self, year: u16, dataset: ErgastDataset) -> String {
        format!("{}/{}/{}", self.base_url, year, dataset.endpoint())
    }

    async fn get_page(&self, year: u16, dataset: ErgastDataset, offset: usize) -> Result<MrData> {
        let request = self
            .client
            .get(format!("{}.json", self.url(year, dataset)))
            .query(&[("limit", PAGE_LIMIT), ("offset", offset)]);
        let response: ErgastResponse =
            send_json(request, self.retries, Stage::Source, "Ergast request").await?;
        Ok(response.mr_data)
    }

    /// Fetch every page of a dataset and merge the tables.
    #[instrument(skip(self))]
    async fn fetch(&self, year: u16, dataset: ErgastDataset) -> Result<Option<RawDocument>> {
        let mut data = self.get_page(year, dataset, 0).await?;

        let mut offset = PAGE_LIMIT;
        let mut pages = 1;
        while offset < data.total() && pages < MAX_PAGES {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let next = self.get_page(year, dataset, offset).await?;
            data.merge(next);
            offset += PAGE_LIMIT;
            pages += 1;
        }

        Ok(dataset.render(year, &data).map(|content| RawDocument {
            source_id: self.url(year, dataset),
            title: dataset.title(year),
            category: dataset.category().to_string(),
            namespace: dataset.namespace().to_string(),
            content,
            priority: dataset.priority(),
            fetched_at: Utc::now(),
        }))
    }
}

#[async_trait]
impl DocumentSource for ErgastSource {
    fn name(&self) -> &str {
        "ergast"
    }

    fn namespaces(&self) -> Vec<String> {
        self.datasets
            .iter()
            .map(|d| d.namespace().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    async fn collect(&self) -> Collected {
        let mut collected = Collected::default();
        let mut first = true;

        for &year in &self.years {
            for &dataset in &self.datasets {
                if !first && !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                first = false;

                match self.fetch(year, dataset).await {
                    Ok(Some(doc)) => {
                        info!("Fetched {} for {}", dataset, year);
                        collected.documents.push(doc);
                    }
                    Ok(None) => collected.errors.push(format!("No data: {} {}", dataset, year)),
                    Err(e) => {
                        warn!("Error fetching {} for {}: {}", dataset, year, e);
                        collected
                            .errors
                            .push(format!("Error: {} {}: {}", dataset, year, e));
                    }
                }
            }
        }

        info!(
            "Ergast fetch complete: {} ok, {} failed",
            collected.documents.len(),
            collected.errors.len()
        );
        collected
    }
}

// Response shapes. Only the fields rendered below are modelled.

#[derive(Debug, Deserialize)]
struct ErgastResponse {
    #[serde(rename = "MRData")]
    mr_data: MrData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MrData {
    #[serde(rename = "total", default)]
    total: String,
    race_table: Option<RaceTable>,
    standings_table: Option<StandingsTable>,
    driver_table: Option<DriverTable>,
    constructor_table: Option<ConstructorTable>,
    circuit_table: Option<CircuitTable>,
}

impl MrData {
    fn total(&self) -> usize {
        self.total.parse().unwrap_or(0)
    }

    /// Append a later page. A race split across pages is joined back together.
    fn merge(&mut self, next: MrData) {
        if let (Some(table), Some(next_table)) = (self.race_table.as_mut(), next.race_table) {
            for race in next_table.races {
                match table.races.last_mut() {
                    Some(last) if last.round == race.round => last.results.extend(race.results),
                    _ => table.races.push(race),
                }
            }
        }
        if let (Some(table), Some(next_table)) = (self.driver_table.as_mut(), next.driver_table) {
            table.drivers.extend(next_table.drivers);
        }
        if let (Some(table), Some(next_table)) =
            (self.constructor_table.as_mut(), next.constructor_table)
        {
            table.constructors.extend(next_table.constructors);
        }
        if let (Some(table), Some(next_table)) = (self.circuit_table.as_mut(), next.circuit_table) {
            table.circuits.extend(next_table.circuits);
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RaceTable {
    #[serde(default)]
    races: Vec<Race>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Race {
    #[serde(default)]
    round: String,
    #[serde(default)]
    race_name: String,
    #[serde(default)]
    date: String,
    #[serde(rename = "Circuit")]
    circuit: Option<Circuit>,
    #[serde(rename = "Results", default)]
    results: Vec<RaceResult>,
}

#[derive(Debug, Deserialize)]
struct RaceResult {
    #[serde(default)]
    position: String,
    #[serde(default)]
    status: String,
    #[serde(rename = "Driver")]
    driver: Option<Driver>,
    #[serde(rename = "Constructor")]
    constructor: Option<Constructor>,
    #[serde(rename = "Time")]
    time: Option<RaceTime>,
}

#[derive(Debug, Deserialize)]
struct RaceTime {
    time: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StandingsTable {
    #[serde(default)]
    standings_lists: Vec<StandingsList>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StandingsList {
    #[serde(default)]
    driver_standings: Vec<DriverStanding>,
    #[serde(default)]
    constructor_standings: Vec<ConstructorStanding>,
}

#[derive(Debug, Deserialize)]
struct DriverStanding {
    #[serde(default)]
    position: String,
    #[serde(default)]
    points: String,
    #[serde(default)]
    wins: String,
    #[serde(rename = "Driver")]
    driver: Option<Driver>,
    #[serde(rename = "Constructors", default)]
    constructors: Vec<Constructor>,
}

#[derive(Debug, Deserialize)]
struct ConstructorStanding {
    #[serde(default)]
    position: String,
    #[serde(default)]
    points: String,
    #[serde(default)]
    wins: String,
    #[serde(rename = "Constructor")]
    constructor: Option<Constructor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DriverTable {
    #[serde(default)]
    drivers: Vec<Driver>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Driver {
    #[serde(default)]
    given_name: String,
    #[serde(default)]
    family_name: String,
    #[serde(default)]
    nationality: String,
    #[serde(default)]
    date_of_birth: String,
    permanent_number: Option<String>,
    #[serde(default)]
    code: String,
}

impl Driver {
    fn full_name(&self) -> String {
        format!("{} {}", self.given_name, self.family_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ConstructorTable {
    #[serde(default)]
    constructors: Vec<Constructor>,
}

#[derive(Debug, Default, Deserialize)]
struct Constructor {
    #[serde(default)]
    name: String,
    #[serde(default)]
    nationality: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CircuitTable {
    #[serde(default)]
    circuits: Vec<Circuit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Circuit {
    #[serde(default)]
    circuit_name: String,
    #[serde(rename = "Location")]
    location: Option<Location>,
}

#[derive(Debug, Deserialize)]
struct Location {
    #[serde(default)]
    locality: String,
    #[serde(default)]
    country: String,
}

fn render_race_results(year: u16, data: &MrData) -> Option<String> {
    let races = &data.race_table.as_ref()?.races;
    if races.is_empty() {
        return None;
    }

    let mut lines = vec![format!("Formula 1 {} Season Race Results\n", year)];
    for race in races {
        let circuit = race
            .circuit
            .as_ref()
            .map(|c| c.circuit_name.as_str())
            .unwrap_or_default();
        lines.push(format!("\n{} - {} ({})", race.race_name, circuit, race.date));

        for result in race.results.iter().take(RESULTS_PER_RACE) {
            let driver = result.driver.as_ref().map(Driver::full_name).unwrap_or_default();
            let constructor = result
                .constructor
                .as_ref()
                .map(|c| c.name.as_str())
                .unwrap_or_default();
            let time = result
                .time
                .as_ref()
                .map(|t| t.time.as_str())
                .unwrap_or(result.status.as_str());
            lines.push(format!(
                "  P{}: {} ({}) - {}",
                result.position, driver, constructor, time
            ));
        }
    }
    Some(lines.join("\n"))
}

fn first_standings(data: &MrData) -> Option<&StandingsList> {
    data.standings_table.as_ref()?.standings_lists.first()
}

fn render_driver_standings(year: u16, data: &MrData) -> Option<String> {
    let standings = &first_standings(data)?.driver_standings;
    if standings.is_empty() {
        return None;
    }

    let mut lines = vec![format!("Formula 1 {} Drivers' Championship Standings\n", year)];
    for s in standings {
        let driver = s.driver.as_ref();
        let name = driver.map(Driver::full_name).unwrap_or_default();
        let nationality = driver.map(|d| d.nationality.as_str()).unwrap_or_default();
        let constructor = s.constructors.first().map(|c| c.name.as_str()).unwrap_or_default();
        lines.push(format!(
            "P{}: {} ({}) - {} - {} points, {} wins",
            s.position, name, nationality, constructor, s.points, s.wins
        ));
    }
    Some(lines.join("\n"))
}

fn render_constructor_standings(year: u16, data: &MrData) -> Option<String> {
    let standings = &first_standings(data)?.constructor_standings;
    if standings.is_empty() {
        return None;
    }

    let mut lines = vec![format!(
        "Formula 1 {} Constructors' Championship Standings\n",
        year
    )];
    for s in standings {
        let (name, nationality) = s
            .constructor
            .as_ref()
            .map(|c| (c.name.as_str(), c.nationality.as_str()))
            .unwrap_or_default();
        lines.push(format!(
            "P{}: {} ({}) - {} points, {} wins",
            s.position, name, nationality, s.points, s.wins
        ));
    }
    Some(lines.join("\n"))
}

fn render_drivers(year: u16, data: &MrData) -> Option<String> {
    let drivers = &data.driver_table.as_ref()?.drivers;
    if drivers.is_empty() {
        return None;
    }

    let mut lines = vec![format!("Formula 1 {} Season Drivers\n", year)];
    for d in drivers {
        lines.push(format!(
            "{} ({}) - #{} - {} - Born: {}",
            d.full_name(),
            d.code,
            d.permanent_number.as_deref().unwrap_or("N/A"),
            d.nationality,
            d.date_of_birth
        ));
    }
    Some(lines.join("\n"))
}

fn render_constructors(year: u16, data: &MrData) -> Option<String> {
    let constructors = &data.constructor_table.as_ref()?.constructors;
    if constructors.is_empty() {
        return None;
    }

    let mut lines = vec![format!("Formula 1 {} Season Constructors/Teams\n", year)];
    for c in constructors {
        lines.push(format!("{} ({})", c.name, c.nationality));
    }
    Some(lines.join("\n"))
}

fn render_circuits(year: u16, data: &MrData) -> Option<String> {
    let circuits = &data.circuit_table.as_ref()?.circuits;
    if circuits.is_empty() {
        return None;
    }

    let mut lines = vec![format!("Formula 1 {} Season Circuits\n", year)];
    for c in circuits {
        match &c.location {
            Some(loc) => lines.push(format!(
                "{} - {}, {}",
                c.circuit_name, loc.locality, loc.country
            )),
            None => lines.push(c.circuit_name.clone()),
        }
    }
    Some(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> MrData {
        serde_json::from_str::<ErgastResponse>(body).unwrap().mr_data
    }

    const RESULTS_PAGE_1: &str = r#"{"MRData": {"total": "3", "limit": "2", "offset": "0",
        "RaceTable": {"season": "2023", "Races": [{
            "season": "2023", "round": "1", "raceName": "Bahrain Grand Prix", "date": "2023-03-05",
            "Circuit": {"circuitId": "bahrain", "circuitName": "Bahrain International Circuit",
                        "Location": {"locality": "Sakhir", "country": "Bahrain"}},
            "Results": [
                {"position": "1", "status": "Finished",
                 "Driver": {"givenName": "Max", "familyName": "Verstappen"},
                 "Constructor": {"name": "Red Bull"},
                 "Time": {"millis": "5636736", "time": "1:33:56.736"}},
                {"position": "2", "status": "Finished",
                 "Driver": {"givenName": "Sergio", "familyName": "Pérez"},
                 "Constructor": {"name": "Red Bull"},
                 "Time": {"time": "+11.987"}}
            ]}]}}}"#;

    const RESULTS_PAGE_2: &str = r#"{"MRData": {"total": "3", "limit": "2", "offset": "2",
        "RaceTable": {"season": "2023", "Races": [{
            "round": "1", "raceName": "Bahrain Grand Prix", "date": "2023-03-05",
            "Results": [
                {"position": "3", "status": "+1 Lap",
                 "Driver": {"givenName": "Fernando", "familyName": "Alonso"},
                 "Constructor": {"name": "Aston Martin"}}
            ]}]}}}"#;

    #[test]
    fn test_render_race_results_merges_pages() {
        let mut data = parse(RESULTS_PAGE_1);
        assert_eq!(data.total(), 3);
        data.merge(parse(RESULTS_PAGE_2));

        let text = ErgastDataset::RaceResults.render(2023, &data).unwrap();
        assert!(text.starts_with("Formula 1 2023 Season Race Results"));
        assert!(text.contains("Bahrain Grand Prix - Bahrain International Circuit (2023-03-05)"));
        assert!(text.contains("  P1: Max Verstappen (Red Bull) - 1:33:56.736"));
        assert!(text.contains("  P3: Fernando Alonso (Aston Martin) - +1 Lap"));
        assert_eq!(text.matches("Bahrain Grand Prix").count(), 1);
    }

    #[test]
    fn test_render_driver_standings() {
        let data = parse(
            r#"{"MRData": {"total": "1", "StandingsTable": {"StandingsLists": [{
                "DriverStandings": [{"position": "1", "points": "575", "wins": "19",
                    "Driver": {"givenName": "Max", "familyName": "Verstappen", "nationality": "Dutch"},
                    "Constructors": [{"name": "Red Bull", "nationality": "Austrian"}]}]}]}}}"#,
        );
        let text = ErgastDataset::DriverStandings.render(2023, &data).unwrap();
        assert!(text.contains("P1: Max Verstappen (Dutch) - Red Bull - 575 points, 19 wins"));
    }

    #[test]
    fn test_render_drivers_without_number() {
        let data = parse(
            r#"{"MRData": {"total": "1", "DriverTable": {"Drivers": [
                {"givenName": "Oliver", "familyName": "Bearman", "code": "BEA",
                 "nationality": "British", "dateOfBirth": "2005-05-08"}]}}}"#,
        );
        let text = ErgastDataset::Drivers.render(2024, &data).unwrap();
        assert!(text.contains("Oliver Bearman (BEA) - #N/A - British - Born: 2005-05-08"));
    }

    #[test]
    fn test_render_circuits() {
        let data = parse(
            r#"{"MRData": {"total": "1", "CircuitTable": {"Circuits": [
                {"circuitName": "Autodromo Nazionale di Monza",
                 "Location": {"locality": "Monza", "country": "Italy"}}]}}}"#,
        );
        let text = ErgastDataset::Circuits.render(2024, &data).unwrap();
        assert!(text.contains("Autodromo Nazionale di Monza - Monza, Italy"));
    }

    #[test]
    fn test_empty_season_renders_nothing() {
        let data = parse(r#"{"MRData": {"total": "0", "RaceTable": {"Races": []}}}"#);
        assert!(ErgastDataset::RaceResults.render(2030, &data).is_none());
        assert!(ErgastDataset::Drivers.render(2030, &data).is_none());
    }

    #[test]
    fn test_dataset_namespaces() {
        assert_eq!(ErgastDataset::DriverStandings.namespace(), "ergast-results");
        assert_eq!(ErgastDataset::DriverStandings.category(), "standings");
        assert_eq!(ErgastDataset::Circuits.namespace(), "ergast-circuits");

        let source = ErgastSource::new(
            reqwest::Client::new(),
            "https://api.jolpi.ca/ergast/f1/",
            vec![2024],
            ErgastDataset::ALL.to_vec(),
            Duration::ZERO,
            0,
        );
        assert_eq!(
            source.namespaces(),
            vec!["ergast-circuits", "ergast-constructors", "ergast-drivers", "ergast-results"]
        );
        assert_eq!(
            source.url(2024, ErgastDataset::RaceResults),
            "https://api.jolpi.ca/ergast/f1/2024/results"
        );
    }
}
