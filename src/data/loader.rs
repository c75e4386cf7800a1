//! Load reference tables from a data directory
//!
//! Expected layout:
//!
//! ```text
//! data/
//!   sales_history.csv        date,category,sales
//!   events.json              {"events": [{"name", "date", "multiplier"}]}
//!   surge_profile.json       {event: {category: factor}}
//!   competitor_prices.json   {category: {"competitor_avg_price": price}}
//!   price_elasticity.json    {category: {"elasticity": value}}
//! ```
//!
//! Only the sales history is required; missing JSON files give empty tables.

use super::InMemoryReferenceData;
use crate::calendar::{EventCalendar, RetailEvent};
use crate::error::{Result, RetailError};
use crate::types::DailySales;
use hashbrown::HashMap;
use serde::Deserialize;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

pub const SALES_FILE: &str = "sales_history.csv";
pub const EVENTS_FILE: &str = "events.json";
pub const SURGE_FILE: &str = "surge_profile.json";
pub const COMPETITOR_FILE: &str = "competitor_prices.json";
pub const ELASTICITY_FILE: &str = "price_elasticity.json";

#[derive(Debug, Deserialize)]
struct EventsFile {
    #[serde(default)]
    events: Vec<RetailEvent>,
}

#[derive(Debug, Deserialize)]
struct CompetitorEntry {
    competitor_avg_price: f64,
}

#[derive(Debug, Deserialize)]
struct ElasticityEntry {
    elasticity: f64,
}

/// Loader for the on-disk reference data directory
#[derive(Debug, Clone)]
pub struct ReferenceDataLoader {
    dir: PathBuf,
}

impl ReferenceDataLoader {
    /// Create a loader rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Data directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load every table into memory
    pub fn load(&self) -> Result<InMemoryReferenceData> {
        let mut data = InMemoryReferenceData::new();

        let sales_path = self.dir.join(SALES_FILE);
        let file = fs::File::open(&sales_path).map_err(|e| {
            RetailError::ConfigError(format!(
                "cannot open sales history {}: {}",
                sales_path.display(),
                e
            ))
        })?;
        let rows = data.add_sales_records(parse_sales_csv(file)?)?;
        log::info!("Sales loaded: {} rows from {}", rows, sales_path.display());

        if let Some(contents) = self.read_optional(EVENTS_FILE)? {
            let calendar = parse_events_json(&contents)?;
            log::info!("Events loaded: {} events", calendar.len());
            data.set_calendar(calendar);
        }

        if let Some(contents) = self.read_optional(SURGE_FILE)? {
            let profiles = parse_surge_json(&contents)?;
            log::info!("Surge profiles loaded: {} events", profiles.len());
            for (event, by_category) in profiles {
                for (category, factor) in by_category {
                    data.set_surge_factor(event.clone(), category, factor)?;
                }
            }
        }

        if let Some(contents) = self.read_optional(COMPETITOR_FILE)? {
            for (category, price) in parse_competitor_json(&contents)? {
                data.set_competitor_price(category, price)?;
            }
        }

        if let Some(contents) = self.read_optional(ELASTICITY_FILE)? {
            for (category, elasticity) in parse_elasticity_json(&contents)? {
                data.set_elasticity(category, elasticity);
            }
        }

        Ok(data)
    }

    fn read_optional(&self, name: &str) -> Result<Option<String>> {
        let path = self.dir.join(name);
        if !path.exists() {
            log::debug!("Optional reference file {} not found", path.display());
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }
}

/// Parse `date,category,sales` CSV rows
pub fn parse_sales_csv<R: Read>(reader: R) -> Result<Vec<DailySales>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for row in csv_reader.deserialize() {
        let record: DailySales = row?;
        records.push(record);
    }
    Ok(records)
}

/// Parse the events file into a calendar
pub fn parse_events_json(contents: &str) -> Result<EventCalendar> {
    let file: EventsFile = serde_json::from_str(contents)?;
    EventCalendar::from_events(file.events)
}

/// Parse the surge profile: event -> category -> factor
pub fn parse_surge_json(contents: &str) -> Result<HashMap<String, HashMap<String, f64>>> {
    Ok(serde_json::from_str(contents)?)
}

/// Parse the competitor price table
pub fn parse_competitor_json(contents: &str) -> Result<Vec<(String, f64)>> {
    let table: HashMap<String, CompetitorEntry> = serde_json::from_str(contents)?;
    Ok(table
        .into_iter()
        .map(|(category, entry)| (category, entry.competitor_avg_price))
        .collect())
}

/// Parse the elasticity table
pub fn parse_elasticity_json(contents: &str) -> Result<Vec<(String, f64)>> {
    let table: HashMap<String, ElasticityEntry> = serde_json::from_str(contents)?;
    Ok(table
        .into_iter()
        .map(|(category, entry)| (category, entry.elasticity))
        .collect())
}
