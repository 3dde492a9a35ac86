//! Circular-mean smoothing window.
//!
//! Raw sensor samples pass through a fixed-capacity ring that publishes
//! the arithmetic mean of the samples it currently holds.  The running
//! sum is maintained incrementally — old value subtracted, new value
//! added — so a put is O(1) regardless of window size.

use heapless::Deque;

/// Backing-store capacity.  The runtime window size is clamped to this.
pub const MAX_WINDOW: usize = 64;

/// A moving-average window over the most recent samples.
///
/// A window size below 2 disables smoothing entirely: `put` passes the
/// raw sample through unchanged.  Resizing is destructive — the window
/// contents and running sum are reset, and the mean rebuilds from the
/// next samples.
#[derive(Debug, Default)]
pub struct SmoothingStack {
    window: Deque<f32, MAX_WINDOW>,
    size: usize,
    sum: f32,
    value: f32,
}

impl SmoothingStack {
    pub fn new(size: usize) -> Self {
        let mut stack = Self::default();
        stack.set_size(size);
        stack
    }

    /// Push a sample and return the published (smoothed) value.
    ///
    /// With smoothing disabled the sample itself is returned.  The
    /// caller is responsible for filtering non-finite samples.
    pub fn put(&mut self, value: f32) -> f32 {
        if !self.is_enabled() {
            return value;
        }

        if self.window.len() >= self.size {
            if let Some(oldest) = self.window.pop_front() {
                self.sum -= oldest;
            }
        }

        if self.window.push_back(value).is_err() {
            // Cannot happen while size <= MAX_WINDOW; keep the last mean.
            return self.value;
        }
        self.sum += value;

        self.value = self.sum / self.window.len() as f32;
        self.value
    }

    /// Most recently published mean (0 before the first sample).
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Change the window size.  Destructive: accumulated state resets.
    /// Sizes below 2 disable smoothing; sizes above the backing capacity
    /// are clamped to [`MAX_WINDOW`].
    pub fn set_size(&mut self, size: usize) {
        let size = size.min(MAX_WINDOW);
        if size == self.size {
            return;
        }

        self.clear();
        self.size = if size < 2 { 0 } else { size };
    }

    /// Configured window size (0 when disabled).
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of samples currently held.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn is_enabled(&self) -> bool {
        self.size >= 2
    }

    /// Drop all held samples; the configured size is kept.
    pub fn clear(&mut self) {
        self.window.clear();
        self.sum = 0.0;
        self.value = 0.0;
    }
}
