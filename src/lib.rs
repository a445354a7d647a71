//! # Tide Chart Core Library
//!
//! This library turns one calendar day of tide predictions and sun times into a
//! finished bitmap for a 2.13" (250×122) e-paper panel. The rendering pass is a
//! pure function of its inputs; fetching, caching and the physical panel sit
//! behind small interfaces so they can be swapped out in tests.
//!
//! ## Data Flow
//! 1. **Acquire**: [`tide_data`] fetches tide heights, high/low events and
//!    sunrise/sunset for a date, memoized per date in a [`cache::DayCache`]
//! 2. **Render**: [`chart::render`] maps the day onto pixel space and draws it
//!    into a [`image::RenderedImage`]
//! 3. **Display**: the image is handed to a [`display::Panel`]
//!
//! ## Core Types
//! - [`HiLoEvent`]: a predicted high or low tide
//! - [`TideDay`]: the complete set of render inputs for one day

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

pub mod app;
pub mod cache;
pub mod chart;
pub mod config;
pub mod display;
#[cfg(all(target_os = "linux", feature = "hardware"))]
pub mod epd;
pub mod image;
pub mod tide_data;

use chart::ChartError;

/// High or low water.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TideKind {
    High,
    Low,
}

impl TideKind {
    /// Parse the NOAA `type` field (`"H"` or `"L"`).
    pub fn parse(code: &str) -> Result<Self, ChartError> {
        match code.trim() {
            "H" => Ok(TideKind::High),
            "L" => Ok(TideKind::Low),
            other => Err(ChartError::UnknownTideKind(other.to_string())),
        }
    }
}

/// A predicted high or low tide.
///
/// Events keep the order the data source returned them in. Two events a
/// couple of hours apart can land on overlapping label positions; the chart
/// does not try to separate them.
///
/// # Example
/// ```
/// use tide_chart_lib::{HiLoEvent, TideKind};
///
/// let event = HiLoEvent::parse("2022-07-08 14:51", "H", "7.812").unwrap();
/// assert_eq!(event.kind, TideKind::High);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HiLoEvent {
    /// Local time of the event
    pub time: NaiveDateTime,
    /// High or low water
    pub kind: TideKind,
    /// Predicted height in feet
    pub height: f32,
}

impl HiLoEvent {
    /// Build an event from the raw NOAA fields, e.g. `("2022-07-08 03:39", "L", "1.204")`.
    pub fn parse(time: &str, kind: &str, height: &str) -> Result<Self, ChartError> {
        let time = NaiveDateTime::parse_from_str(time.trim(), "%Y-%m-%d %H:%M")
            .map_err(|_| ChartError::MalformedTime(time.to_string()))?;
        let height = height
            .trim()
            .parse::<f32>()
            .map_err(|_| ChartError::MalformedHeight(height.to_string()))?;
        Ok(HiLoEvent {
            time,
            kind: TideKind::parse(kind)?,
            height,
        })
    }
}

/// Everything the chart needs for one calendar day.
///
/// `samples` are equally spaced heights starting at local midnight (NOAA
/// publishes one every 6 minutes, 240 per day).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TideDay {
    /// Tide heights in feet, oldest first
    pub samples: Vec<f32>,
    /// High and low tides in the order returned by the source
    pub events: Vec<HiLoEvent>,
    /// Local sunrise
    pub sunrise: NaiveTime,
    /// Local sunset
    pub sunset: NaiveTime,
}

impl TideDay {
    /// Assemble a day from `HH:MM:SS` sunrise/sunset strings.
    pub fn from_strings(
        samples: Vec<f32>,
        events: Vec<HiLoEvent>,
        sunrise: &str,
        sunset: &str,
    ) -> Result<Self, ChartError> {
        Ok(TideDay {
            samples,
            events,
            sunrise: parse_time_of_day(sunrise)?,
            sunset: parse_time_of_day(sunset)?,
        })
    }
}

/// Parse a local `HH:MM:SS` time of day.
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, ChartError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M:%S")
        .map_err(|_| ChartError::MalformedTime(value.to_string()))
}
