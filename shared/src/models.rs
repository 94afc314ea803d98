//! Calendar data models.
//!
//! The types fix the key names of the response; column values the database
//! renders (dates, nullable flags) pass through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A row returned with all of its columns.
pub type Record = Map<String, Value>;

/// A world's calendar with its months and events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calendar {
    pub id: i64,
    /// Month definitions, every column
    pub months: Vec<Record>,
    pub events: Vec<CalendarEvent>,
}

/// An event on a world calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: i64,
    #[serde(default)]
    pub title: Value,
    #[serde(default)]
    pub description: Value,
    #[serde(default)]
    pub hidden: Value,
    /// `start_date` as rendered by the database
    #[serde(rename = "startDate", default)]
    pub start_date: Value,
    #[serde(rename = "endDate", default)]
    pub end_date: Value,
    /// Link to the wiki article describing the event
    #[serde(default)]
    pub wiki: Value,
    pub category: Option<Record>,
}
