//! Per-Zone Reading Windows

use crate::SensorReading;
use std::collections::HashMap;
use std::collections::VecDeque;

/// Default window capacity (100 readings per zone)
pub const WINDOW_CAPACITY: usize = 100;

/// Bounded FIFO window of recent readings for one zone.
///
/// Insertion-ordered; pushing at capacity evicts the oldest reading.
#[derive(Debug, Clone)]
pub struct ReadingWindow {
    readings: VecDeque<SensorReading>,
    capacity: usize,
}

impl ReadingWindow {
    /// Create a window with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            readings: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Create a window with the default capacity (100 readings).
    pub fn with_default_capacity() -> Self {
        Self::new(WINDOW_CAPACITY)
    }

    /// Append a reading, evicting the oldest if at capacity.
    pub fn push(&mut self, reading: SensorReading) {
        if self.readings.len() >= self.capacity {
            self.readings.pop_front();
        }
        self.readings.push_back(reading);
    }

    /// Number of readings currently held.
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Check if the window is empty.
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Window capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of the window in insertion order.
    pub fn to_vec(&self) -> Vec<SensorReading> {
        self.readings.iter().cloned().collect()
    }

    /// The most recent reading, if any.
    pub fn latest(&self) -> Option<&SensorReading> {
        self.readings.back()
    }
}

impl Default for ReadingWindow {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Context object owning the per-zone reading windows.
///
/// Held by the detection engine; per-zone ordering is the caller's
/// responsibility (readings for one zone must arrive in order).
#[derive(Debug, Default)]
pub struct ZoneWindows {
    windows: HashMap<String, ReadingWindow>,
    capacity: usize,
}

impl ZoneWindows {
    /// Create with the default per-zone capacity.
    pub fn new() -> Self {
        Self::with_capacity(WINDOW_CAPACITY)
    }

    /// Create with a custom per-zone capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            windows: HashMap::new(),
            capacity,
        }
    }

    /// Append a reading to its zone's window, creating the window on
    /// first sight of the zone. Returns a reference to the window.
    pub fn push(&mut self, reading: SensorReading) -> &ReadingWindow {
        let capacity = self.capacity;
        let window = self
            .windows
            .entry(reading.zone_id.clone())
            .or_insert_with(|| ReadingWindow::new(capacity));
        window.push(reading);
        window
    }

    /// Get a zone's window, if the zone has been seen.
    pub fn get(&self, zone_id: &str) -> Option<&ReadingWindow> {
        self.windows.get(zone_id)
    }

    /// Number of zones with at least one reading.
    pub fn zone_count(&self) -> usize {
        self.windows.len()
    }

    /// Zone ids currently tracked.
    pub fn zone_ids(&self) -> impl Iterator<Item = &str> {
        self.windows.keys().map(|k| k.as_str())
    }
}
