//! Per-date memo for fetched data.
//!
//! Only successful results are stored. A failed fetch invalidates the date so
//! the next refresh goes back to the network. The memo holds at most
//! `capacity` dates; inserting past that evicts the least recently used one.

use chrono::NaiveDate;
use log::debug;
use std::collections::{HashMap, VecDeque};

/// Dates kept per cache unless configured otherwise
pub const DEFAULT_CAPACITY: usize = 128;

/// Results keyed by calendar date, least recently used evicted first.
#[derive(Debug, Clone)]
pub struct DayCache<T> {
    entries: HashMap<NaiveDate, T>,
    /// Oldest use at the front
    recency: VecDeque<NaiveDate>,
    capacity: usize,
}

impl<T: Clone> Default for DayCache<T> {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl<T: Clone> DayCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache holding at most `capacity` dates (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: HashMap::with_capacity(capacity),
            recency: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn get(&mut self, date: NaiveDate) -> Option<T> {
        let value = self.entries.get(&date).cloned()?;
        self.touch(date);
        Some(value)
    }

    pub fn insert(&mut self, date: NaiveDate, value: T) {
        self.entries.insert(date, value);
        self.touch(date);
        while self.entries.len() > self.capacity {
            match self.recency.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                    debug!("Evicted cached data for {}", oldest);
                }
                None => break,
            }
        }
    }

    /// Drop the entry for `date`; returns whether one existed.
    pub fn invalidate(&mut self, date: NaiveDate) -> bool {
        self.recency.retain(|d| *d != date);
        self.entries.remove(&date).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return the cached value for `date`, or run `fetch` and cache its success.
    ///
    /// On failure the date is invalidated and the error is returned.
    pub async fn get_or_fetch<E, F, Fut>(&mut self, date: NaiveDate, fetch: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get(date) {
            return Ok(value);
        }
        match fetch().await {
            Ok(value) => {
                self.insert(date, value.clone());
                debug!("Cached {} ({} of {} days held)", date, self.len(), self.capacity);
                Ok(value)
            }
            Err(e) => {
                self.invalidate(date);
                Err(e)
            }
        }
    }

    /// Mark `date` as the most recently used.
    fn touch(&mut self, date: NaiveDate) {
        if let Some(pos) = self.recency.iter().position(|d| *d == date) {
            self.recency.remove(pos);
        }
        self.recency.push_back(date);
    }
}
