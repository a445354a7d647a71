//! # Tide and Sun Data Fetching
//!
//! This module handles all network operations for one displayed day. Three
//! independent requests feed a [`TideDay`]:
//!
//! ## Data Sources
//!
//! ### NOAA CO-OPS datagetter
//! - **URL**: https://api.tidesandcurrents.noaa.gov/api/prod/datagetter
//! - **Heights**: `product=predictions`, CSV, one row every 6 minutes from local midnight
//! - **High/low**: `product=predictions&interval=hilo`, JSON `{"predictions":[{"t","v","type"}]}`
//! - **Times**: `time_zone=lst_ldt`, i.e. station local time with daylight saving
//!
//! ### sunrise-sunset.org
//! - **URL**: https://api.sunrise-sunset.org/json
//! - `formatted=0` returns RFC 3339 timestamps; `tzid` makes the service report
//!   them in the station's zone so the local time of day can be read off directly
//!
//! ## Caching Strategy
//!
//! Each request type has its own [`DayCache`] keyed by date. Successful results
//! are kept for the life of the process; a failure invalidates that date's
//! entry only, so a later refresh re-fetches just the part that failed.
//!
//! ## Error Handling
//!
//! All three requests are attempted on every refresh. Any failure is logged
//! and returned as a [`FetchError`]; the caller keeps its previous display.

use crate::{
    app::DaySource, cache::DayCache, chart::ChartError, config::StationConfig, HiLoEvent, TideDay,
};
use chrono::{DateTime, NaiveDate, NaiveTime};
use log::{debug, warn};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const NOAA_URL: &str = "https://api.tidesandcurrents.noaa.gov/api/prod/datagetter";
const SUN_URL: &str = "https://api.sunrise-sunset.org/json";

/// Errors that can occur while fetching or decoding a day's data.
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request failed (network, server, or protocol error)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with an error message instead of data
    #[error("service error: {0}")]
    Service(String),

    /// The response body did not have the expected shape
    #[error("unexpected response: {0}")]
    Parse(String),

    /// Fewer height rows than the chart needs
    #[error("expected {expected} tide heights, got {actual}")]
    TooFewSamples { expected: usize, actual: usize },

    /// A field parsed structurally but its value is unusable
    #[error("invalid data: {0}")]
    Invalid(#[from] ChartError),
}

/// Local sunrise and sunset for one day.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SunTimes {
    pub sunrise: NaiveTime,
    pub sunset: NaiveTime,
}

#[derive(Deserialize)]
struct HiLoResponse {
    #[serde(default)]
    predictions: Vec<RawHiLo>,
    error: Option<ServiceMessage>,
}

#[derive(Deserialize)]
struct RawHiLo {
    t: String,
    v: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct ServiceMessage {
    message: String,
}

#[derive(Deserialize)]
struct SunResponse {
    results: serde_json::Value,
    status: String,
}

#[derive(Deserialize)]
struct SunResults {
    sunrise: String,
    sunset: String,
}

/// Parse the NOAA heights CSV, keeping the first `sample_count` rows.
///
/// ```text
/// Date Time, Prediction
/// 2022-07-08 00:00,6.123
/// 2022-07-08 00:06,6.201
/// ```
pub fn parse_heights_csv(body: &str, sample_count: usize) -> Result<Vec<f32>, FetchError> {
    let mut lines = body.lines();
    match lines.next().map(str::trim) {
        Some(header) if header.starts_with("Date Time") => {}
        Some(other) => return Err(FetchError::Service(other.to_string())),
        None => return Err(FetchError::Parse("empty heights response".to_string())),
    }

    let mut heights = Vec::with_capacity(sample_count);
    for line in lines.map(str::trim).filter(|l| !l.is_empty()) {
        if heights.len() == sample_count {
            break;
        }
        let value = line
            .split(',')
            .nth(1)
            .ok_or_else(|| FetchError::Parse(format!("missing height in row {line:?}")))?;
        let height = value
            .trim()
            .parse::<f32>()
            .map_err(|_| ChartError::MalformedHeight(value.to_string()))?;
        heights.push(height);
    }

    if heights.len() < sample_count {
        return Err(FetchError::TooFewSamples {
            expected: sample_count,
            actual: heights.len(),
        });
    }
    Ok(heights)
}

/// Parse the NOAA high/low JSON into events, keeping the service's order.
pub fn parse_hilo_json(body: &str) -> Result<Vec<HiLoEvent>, FetchError> {
    let response: HiLoResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;
    if let Some(error) = response.error {
        return Err(FetchError::Service(error.message));
    }
    response
        .predictions
        .iter()
        .map(|p| HiLoEvent::parse(&p.t, &p.kind, &p.v).map_err(FetchError::from))
        .collect()
}

/// Parse a sunrise-sunset.org response requested with `formatted=0`.
pub fn parse_sun_json(body: &str) -> Result<SunTimes, FetchError> {
    let response: SunResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;
    if response.status != "OK" {
        return Err(FetchError::Service(response.status));
    }
    let results: SunResults =
        serde_json::from_value(response.results).map_err(|e| FetchError::Parse(e.to_string()))?;
    Ok(SunTimes {
        sunrise: local_time_of_day(&results.sunrise)?,
        sunset: local_time_of_day(&results.sunset)?,
    })
}

/// Time of day in the offset the timestamp was written in.
fn local_time_of_day(timestamp: &str) -> Result<NaiveTime, ChartError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|dt| dt.time())
        .map_err(|_| ChartError::MalformedTime(timestamp.to_string()))
}

/// HTTP client for the three day requests. Uncached.
#[derive(Debug, Clone)]
pub struct TideService {
    client: reqwest::Client,
    station: StationConfig,
    sample_count: usize,
}

impl TideService {
    pub fn new(station: &StationConfig, sample_count: usize) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(station.timeout_secs))
            .user_agent(concat!("tide-chart/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(TideService {
            client,
            station: station.clone(),
            sample_count,
        })
    }

    pub async fn fetch_sun_times(&self, date: NaiveDate) -> Result<SunTimes, FetchError> {
        let params = [
            ("lat", self.station.latitude.to_string()),
            ("lng", self.station.longitude.to_string()),
            ("date", date.format("%Y-%m-%d").to_string()),
            ("formatted", "0".to_string()),
            ("tzid", self.station.time_zone.clone()),
        ];
        let body = self.get(SUN_URL, &params).await?;
        debug!("Queried sun times for {}", date);
        parse_sun_json(&body)
    }

    pub async fn fetch_heights(&self, date: NaiveDate) -> Result<Vec<f32>, FetchError> {
        let mut params = self.noaa_params(date);
        params.push(("format", "csv".to_string()));
        let body = self.get(NOAA_URL, &params).await?;
        debug!("Queried tide heights for {}", date);
        parse_heights_csv(&body, self.sample_count)
    }

    pub async fn fetch_hilo(&self, date: NaiveDate) -> Result<Vec<HiLoEvent>, FetchError> {
        let mut params = self.noaa_params(date);
        params.push(("interval", "hilo".to_string()));
        params.push(("format", "json".to_string()));
        let body = self.get(NOAA_URL, &params).await?;
        debug!("Queried high/low tides for {}", date);
        parse_hilo_json(&body)
    }

    fn noaa_params(&self, date: NaiveDate) -> Vec<(&'static str, String)> {
        vec![
            ("begin_date", date.format("%Y%m%d").to_string()),
            ("range", "24".to_string()),
            ("station", self.station.id.clone()),
            ("product", "predictions".to_string()),
            ("datum", self.station.datum.clone()),
            ("units", "english".to_string()),
            ("time_zone", "lst_ldt".to_string()),
            ("application", self.station.application.clone()),
        ]
    }

    async fn get(&self, url: &str, params: &[(&'static str, String)]) -> Result<String, FetchError> {
        let body = self
            .client
            .get(url)
            .query(params)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

/// [`TideService`] with a per-date cache for each request type.
#[derive(Debug)]
pub struct CachedTideSource {
    service: TideService,
    sun: DayCache<SunTimes>,
    heights: DayCache<Vec<f32>>,
    hilo: DayCache<Vec<HiLoEvent>>,
}

impl CachedTideSource {
    pub fn new(service: TideService) -> Self {
        CachedTideSource {
            service,
            sun: DayCache::new(),
            heights: DayCache::new(),
            hilo: DayCache::new(),
        }
    }
}

impl DaySource for CachedTideSource {
    async fn fetch_day(&mut self, date: NaiveDate) -> Result<TideDay, FetchError> {
        let service = &self.service;
        let sun = self
            .sun
            .get_or_fetch(date, || service.fetch_sun_times(date))
            .await;
        let heights = self
            .heights
            .get_or_fetch(date, || service.fetch_heights(date))
            .await;
        let hilo = self.hilo.get_or_fetch(date, || service.fetch_hilo(date)).await;

        report("sunrise/sunset", date, &sun);
        report("tide heights", date, &heights);
        report("high/low tides", date, &hilo);

        let sun = sun?;
        Ok(TideDay {
            samples: heights?,
            events: hilo?,
            sunrise: sun.sunrise,
            sunset: sun.sunset,
        })
    }
}

fn report<T>(what: &str, date: NaiveDate, result: &Result<T, FetchError>) {
    if let Err(e) = result {
        warn!("Failed to pull {} for {}: {}; cleared cached entry", what, date, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TideKind;

    fn heights_body(rows: usize) -> String {
        let mut body = String::from("Date Time, Prediction\n");
        for i in 0..rows {
            body.push_str(&format!(
                "2022-07-08 {:02}:{:02},{:.3}\n",
                i / 10,
                (i % 10) * 6,
                i as f32 / 100.0
            ));
        }
        body
    }

    #[test]
    fn test_parse_heights_csv() {
        let heights = parse_heights_csv(&heights_body(240), 240).unwrap();
        assert_eq!(heights.len(), 240);
        assert_eq!(heights[0], 0.0);
        assert!((heights[239] - 2.39).abs() < 1e-6);
    }

    #[test]
    fn test_parse_heights_csv_truncates_extra_rows() {
        // range=24 can include the following midnight
        let heights = parse_heights_csv(&heights_body(241), 240).unwrap();
        assert_eq!(heights.len(), 240);
    }

    #[test]
    fn test_parse_heights_csv_rejects_short_series() {
        let err = parse_heights_csv(&heights_body(200), 240).unwrap_err();
        assert!(matches!(
            err,
            FetchError::TooFewSamples {
                expected: 240,
                actual: 200
            }
        ));
    }

    #[test]
    fn test_parse_heights_csv_errors() {
        let err = parse_heights_csv("Error: No Predictions data was found.", 240).unwrap_err();
        assert!(matches!(err, FetchError::Service(_)));

        let err = parse_heights_csv("", 240).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));

        let err = parse_heights_csv("Date Time, Prediction\n2022-07-08 00:00,abc\n", 1).unwrap_err();
        assert!(matches!(err, FetchError::Invalid(ChartError::MalformedHeight(_))));
    }

    #[test]
    fn test_parse_hilo_json() {
        let body = r#"{ "predictions" : [
            {"t":"2022-07-08 03:39", "v":"1.204", "type":"L"},
            {"t":"2022-07-08 10:52", "v":"6.512", "type":"H"},
            {"t":"2022-07-08 15:20", "v":"4.733", "type":"L"},
            {"t":"2022-07-08 22:01", "v":"8.018", "type":"H"}
        ]}"#;
        let events = parse_hilo_json(body).unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].kind, TideKind::Low);
        assert_eq!(events[3].kind, TideKind::High);
        assert!((events[3].height - 8.018).abs() < 1e-6);
    }

    #[test]
    fn test_parse_hilo_json_errors() {
        let body = r#"{"error": {"message": "No Predictions data was found."}}"#;
        assert!(matches!(parse_hilo_json(body), Err(FetchError::Service(_))));

        assert!(matches!(parse_hilo_json("<html>"), Err(FetchError::Parse(_))));

        let body = r#"{"predictions":[{"t":"2022-07-08 03:39","v":"1.2","type":"M"}]}"#;
        assert!(matches!(
            parse_hilo_json(body),
            Err(FetchError::Invalid(ChartError::UnknownTideKind(_)))
        ));
    }

    #[test]
    fn test_parse_sun_json_reads_local_time() {
        let body = r#"{"results":{"sunrise":"2022-07-08T05:20:03-07:00",
            "sunset":"2022-07-08T21:08:44-07:00","solar_noon":"2022-07-08T13:14:23-07:00"},
            "status":"OK","tzid":"America/Los_Angeles"}"#;
        let sun = parse_sun_json(body).unwrap();
        assert_eq!(sun.sunrise, NaiveTime::from_hms_opt(5, 20, 3).unwrap());
        assert_eq!(sun.sunset, NaiveTime::from_hms_opt(21, 8, 44).unwrap());
    }

    #[test]
    fn test_parse_sun_json_errors() {
        let body = r#"{"results":"","status":"INVALID_DATE"}"#;
        assert!(matches!(parse_sun_json(body), Err(FetchError::Service(s)) if s == "INVALID_DATE"));

        let body = r#"{"results":{"sunrise":"5:20:03 AM","sunset":"9:08:44 PM"},"status":"OK"}"#;
        assert!(matches!(
            parse_sun_json(body),
            Err(FetchError::Invalid(ChartError::MalformedTime(_)))
        ));
    }

    #[test]
    fn test_noaa_params() {
        let service = TideService::new(&StationConfig::default(), 240).unwrap();
        let date = NaiveDate::from_ymd_opt(2022, 7, 8).unwrap();
        let params = service.noaa_params(date);
        assert!(params.contains(&("begin_date", "20220708".to_string())));
        assert!(params.contains(&("station", "9449988".to_string())));
        assert!(params.contains(&("time_zone", "lst_ldt".to_string())));
    }
}
