//! Prediction Buffer - bounded history of scored samples
//!
//! Append-only, capacity-bounded, FIFO eviction by arrival order.
//! Arrival order and timestamp order can diverge when samples arrive late;
//! eviction always follows arrival.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::record::PredictionRecord;
use crate::constants::DEFAULT_BUFFER_CAPACITY;

// ============================================================================
// BUFFER
// ============================================================================

#[derive(Debug, Clone)]
pub struct PredictionBuffer {
    records: VecDeque<PredictionRecord>,
    capacity: usize,
    total_ingested: u64,
    total_evicted: u64,
}

/// Listing order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Timestamp descending, newest arrival first on ties
    #[default]
    Newest,
    /// Insertion order, oldest first
    Arrival,
}

/// One page of a listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_records: usize,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
            total_records: self.total_records,
        }
    }
}

impl PredictionBuffer {
    /// Create a buffer holding at most `capacity` records (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
            total_ingested: 0,
            total_evicted: 0,
        }
    }

    /// Append a record, evicting the oldest arrivals beyond capacity
    ///
    /// Returns the evicted records, oldest first.
    pub fn push(&mut self, record: PredictionRecord) -> Vec<PredictionRecord> {
        self.records.push_back(record);
        self.total_ingested += 1;

        let mut evicted = Vec::new();
        while self.records.len() > self.capacity {
            if let Some(oldest) = self.records.pop_front() {
                evicted.push(oldest);
            }
        }
        self.total_evicted += evicted.len() as u64;

        evicted
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records in arrival order
    pub fn iter(&self) -> impl Iterator<Item = &PredictionRecord> {
        self.records.iter()
    }

    /// The `n` most recent arrivals, oldest first
    pub fn latest(&self, n: usize) -> Vec<&PredictionRecord> {
        let skip = self.records.len().saturating_sub(n);
        self.records.iter().skip(skip).collect()
    }

    /// Paginate the buffer
    ///
    /// `page` is 1-based and clamped into `1..=total_pages`. A zero page size
    /// is treated as one.
    pub fn list(&self, page: usize, page_size: usize, order: SortOrder) -> Page<&PredictionRecord> {
        let page_size = page_size.max(1);
        let total_records = self.records.len();
        let total_pages = total_records.div_ceil(page_size).max(1);
        let page = page.clamp(1, total_pages);

        let mut ordered: Vec<&PredictionRecord> = self.records.iter().collect();
        if order == SortOrder::Newest {
            // Reverse first so the stable sort keeps newest arrivals first on ties
            ordered.reverse();
            ordered.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        }

        let items = ordered
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .collect();

        Page {
            items,
            page,
            page_size,
            total_pages,
            total_records,
        }
    }

    /// Get buffer status
    pub fn status(&self) -> BufferStatus {
        BufferStatus {
            current_size: self.records.len(),
            capacity: self.capacity,
            fill_percent: (self.records.len() as f32 / self.capacity as f32 * 100.0).min(100.0),
            total_ingested: self.total_ingested,
            total_evicted: self.total_evicted,
        }
    }
}

impl Default for PredictionBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY)
    }
}

/// Buffer status information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferStatus {
    pub current_size: usize,
    pub capacity: usize,
    pub fill_percent: f32,
    pub total_ingested: u64,
    pub total_evicted: u64,
}

// ============================================================================
// TESTS
// ============================================================================
