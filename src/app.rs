//! # Day Navigation
//!
//! [`Navigator`] is the device's main loop: it shows one calendar day at a
//! time, re-renders only when the selected day changes, and moves between days
//! on button presses. A day that fails to fetch or render leaves the previous
//! image on the panel and is retried on the next pass.

use crate::{
    chart::{self, ChartError, ChartGeometry},
    config::ButtonConfig,
    display::{ButtonEvent, Panel, PanelError},
    tide_data::FetchError,
    TideDay,
};
use chrono::{Days, NaiveDate};
use log::{debug, error, info, warn};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Anything that can produce the render inputs for a date.
#[allow(async_fn_in_trait)]
pub trait DaySource {
    async fn fetch_day(&mut self, date: NaiveDate) -> Result<TideDay, FetchError>;
}

/// Why a refresh left the panel unchanged.
#[derive(Error, Debug)]
pub enum RefreshError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("render failed: {0}")]
    Render(#[from] ChartError),

    #[error("panel update failed: {0}")]
    Panel(#[from] PanelError),
}

/// Result of a [`Navigator::refresh`] that did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Refresh {
    /// A new image was handed to the panel
    Rendered,
    /// The selected day is already on the panel
    Unchanged,
}

/// Loop timing.
#[derive(Clone, Copy, Debug)]
pub struct Timing {
    pub debounce: Duration,
    pub poll: Duration,
    /// Minimum gap between attempts at a day that failed
    pub retry: Duration,
}

impl From<&ButtonConfig> for Timing {
    fn from(buttons: &ButtonConfig) -> Self {
        Timing {
            debounce: Duration::from_millis(buttons.debounce_ms),
            poll: Duration::from_millis(buttons.poll_ms),
            retry: Duration::from_millis(buttons.retry_ms),
        }
    }
}

/// Selected day, the panel, and what is currently shown on it.
pub struct Navigator<S, P> {
    source: S,
    panel: P,
    geometry: ChartGeometry,
    current: NaiveDate,
    last_rendered: Option<NaiveDate>,
    last_good: Option<(NaiveDate, TideDay)>,
}

impl<S: DaySource, P: Panel> Navigator<S, P> {
    pub fn new(source: S, panel: P, geometry: ChartGeometry, start: NaiveDate) -> Self {
        Navigator {
            source,
            panel,
            geometry,
            current: start,
            last_rendered: None,
            last_good: None,
        }
    }

    pub fn current(&self) -> NaiveDate {
        self.current
    }

    /// Day currently on the panel.
    pub fn last_rendered(&self) -> Option<NaiveDate> {
        self.last_rendered
    }

    /// Inputs of the last successful render.
    pub fn last_good(&self) -> Option<&(NaiveDate, TideDay)> {
        self.last_good.as_ref()
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }

    /// Show the selected day if it isn't on the panel already.
    pub async fn refresh(&mut self) -> Result<Refresh, RefreshError> {
        if self.last_rendered == Some(self.current) {
            return Ok(Refresh::Unchanged);
        }
        let date = self.current;
        let day = self.source.fetch_day(date).await?;
        let image = chart::render(&self.geometry, &day)?;
        self.panel.render(image)?;

        info!("Displayed tide chart for {}", date);
        self.last_rendered = Some(date);
        self.last_good = Some((date, day));
        Ok(Refresh::Rendered)
    }

    /// Render the last successful inputs again, e.g. after the panel was cleared.
    pub fn redraw_last(&mut self) -> Option<Result<(), RefreshError>> {
        let (_, day) = self.last_good.as_ref()?;
        let result = chart::render(&self.geometry, day)
            .map_err(RefreshError::from)
            .and_then(|image| self.panel.render(image).map_err(RefreshError::from));
        Some(result)
    }

    /// Move the selected day. Returns whether the day changed.
    pub fn apply(&mut self, event: ButtonEvent) -> bool {
        let moved = match event {
            ButtonEvent::None => None,
            ButtonEvent::Next => self.current.checked_add_days(Days::new(1)),
            ButtonEvent::Previous => self.current.checked_sub_days(Days::new(1)),
        };
        match moved {
            Some(date) => {
                debug!("Selected {}", date);
                self.current = date;
                true
            }
            None => false,
        }
    }

    /// Refresh, poll buttons, sleep; forever.
    ///
    /// A day that failed is not fetched again until `timing.retry` has passed,
    /// unless a button press selects a different day first.
    pub async fn run(&mut self, timing: Timing) {
        let mut backoff: Option<(NaiveDate, Instant)> = None;
        loop {
            let waiting = backoff
                .is_some_and(|(date, until)| date == self.current && Instant::now() < until);
            if !waiting {
                match self.refresh().await {
                    Ok(_) => backoff = None,
                    Err(e) => {
                        match &e {
                            RefreshError::Fetch(_) => {
                                warn!("Keeping previous display for {}: {}", self.current, e)
                            }
                            _ => error!("Keeping previous display for {}: {}", self.current, e),
                        }
                        backoff = Some((self.current, Instant::now() + timing.retry));
                    }
                }
            }

            let event = self.panel.poll_buttons();
            let pause = if self.apply(event) {
                timing.debounce
            } else {
                timing.poll
            };
            tokio::time::sleep(pause).await;
        }
    }
}
