use crate::domain::product::CleanRow;

/// Default number of rows written per bulk insert.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Bounded accumulator of rows waiting to be flushed.
///
/// The batch never flushes itself: `push` reports when capacity is reached
/// and the caller writes `rows()` out, then calls `clear`.
#[derive(Debug)]
pub struct Batch {
    rows: Vec<CleanRow>,
    capacity: usize,
}

impl Batch {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            rows: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a row and returns `true` once the batch is full.
    pub fn push(&mut self, row: CleanRow) -> bool {
        self.rows.push(row);
        self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.rows.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[CleanRow] {
        &self.rows
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }
}

impl Default for Batch {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_BATCH_SIZE)
    }
}
