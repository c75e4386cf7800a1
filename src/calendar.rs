//! Retail event calendar (festivals, sales seasons)

use crate::error::{Result, RetailError};
use crate::types::{Days, EventProximity};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A dated retail event with its generic demand multiplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetailEvent {
    pub name: String,
    pub date: NaiveDate,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_multiplier() -> f64 {
    1.0
}

impl RetailEvent {
    /// Create a new event
    pub fn new(name: impl Into<String>, date: NaiveDate, multiplier: f64) -> Result<Self> {
        let event = Self {
            name: name.into(),
            date,
            multiplier,
        };
        event.validate()?;
        Ok(event)
    }

    /// Multiplier must be a finite non-negative number
    pub fn validate(&self) -> Result<()> {
        if !self.multiplier.is_finite() || self.multiplier < 0.0 {
            return Err(RetailError::CalendarError(format!(
                "event '{}' multiplier must be a non-negative number, got {}",
                self.name, self.multiplier
            )));
        }
        Ok(())
    }

    /// Days from `from` until this event; `None` if the event is in the past
    pub fn days_from(&self, from: NaiveDate) -> Option<Days> {
        let days = (self.date - from).num_days();
        if days < 0 {
            None
        } else {
            Days::try_from(days).ok()
        }
    }
}

/// Calendar of retail events, kept sorted by date.
///
/// Every event is validated on the way in.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EventCalendar {
    events: Vec<RetailEvent>,
}

impl EventCalendar {
    /// Create an empty calendar
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Build a calendar from a list of events
    pub fn from_events(events: Vec<RetailEvent>) -> Result<Self> {
        for event in &events {
            event.validate()?;
        }
        let mut calendar = Self { events };
        calendar.events.sort_by_key(|e| e.date);
        Ok(calendar)
    }

    /// Add an event; an event with the same name and date is replaced
    pub fn add_event(&mut self, event: RetailEvent) -> Result<()> {
        event.validate()?;
        self.events
            .retain(|e| !(e.name == event.name && e.date == event.date));
        self.events.push(event);
        self.events.sort_by_key(|e| e.date);
        Ok(())
    }

    /// All events in date order
    pub fn events(&self) -> &[RetailEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Nearest event on or after `from` and at most `window_days` away.
    ///
    /// Ties on the same date resolve to the event registered first.
    pub fn nearest_event(&self, from: NaiveDate, window_days: Days) -> Option<(&RetailEvent, Days)> {
        self.events
            .iter()
            .filter_map(|e| e.days_from(from).map(|d| (e, d)))
            .filter(|(_, d)| *d <= window_days)
            .min_by_key(|(_, d)| *d)
    }

    /// Proximity record for the nearest event, if any
    pub fn proximity(&self, from: NaiveDate, window_days: Days) -> Option<EventProximity> {
        self.nearest_event(from, window_days)
            .map(|(event, days)| EventProximity {
                name: event.name.clone(),
                days_to_event: days,
            })
    }

    /// Events between two dates (inclusive)
    pub fn events_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<&RetailEvent> {
        self.events
            .iter()
            .filter(|e| e.date >= start && e.date <= end)
            .collect()
    }
}
