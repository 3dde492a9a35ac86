//! Adaptive actuation-duration predictor.
//!
//! Learns how fast an actuator moves a quantity at different operating
//! points.  The quantity's range is split into fixed-width buckets; each
//! bucket keeps a small ring of recent *efficiency* samples (units of
//! change per 100 ms), separately for increasing and decreasing
//! movements, and publishes the mean of the non-zero samples it holds.
//!
//! Predictions are clamped into a configured duration window so a
//! sparse or unstable data point can never command a pathologically
//! short or long run.

use serde::{Deserialize, Serialize};

/// Buckets per direction.  With the humidity bucket width of 5.0 this
/// covers the full 0–100 % range.
pub const RANGE_COUNT: usize = 20;

/// Efficiency samples retained per bucket.
pub const SAMPLES_PER_RANGE: usize = 10;

/// Changes smaller than this are not worth actuating for.
const NEGLIGIBLE_CHANGE: f32 = 0.5;

/// Persistable snapshot of the learned table: one mean efficiency per
/// bucket and direction.  The storage format behind
/// [`ProfilePort`](crate::app::ports::ProfilePort) is opaque to the
/// predictor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyProfile {
    pub increase: [f32; RANGE_COUNT],
    pub decrease: [f32; RANGE_COUNT],
}

impl Default for EfficiencyProfile {
    fn default() -> Self {
        Self {
            increase: [0.0; RANGE_COUNT],
            decrease: [0.0; RANGE_COUNT],
        }
    }
}

/// Per-direction learning table.
#[derive(Debug)]
struct DirectionTable {
    samples: [[f32; SAMPLES_PER_RANGE]; RANGE_COUNT],
    index: [usize; RANGE_COUNT],
    avg: [f32; RANGE_COUNT],
}

impl DirectionTable {
    fn new() -> Self {
        Self {
            samples: [[0.0; SAMPLES_PER_RANGE]; RANGE_COUNT],
            index: [0; RANGE_COUNT],
            avg: [0.0; RANGE_COUNT],
        }
    }

    fn record(&mut self, range: usize, efficiency: f32) {
        let ring = &mut self.samples[range];
        ring[self.index[range]] = efficiency;
        self.index[range] = (self.index[range] + 1) % SAMPLES_PER_RANGE;

        let mut sum = 0.0;
        let mut count = 0u32;
        for sample in ring.iter() {
            if *sample != 0.0 {
                sum += *sample;
                count += 1;
            }
        }
        self.avg[range] = if count > 0 { sum / count as f32 } else { 0.0 };
    }
}

/// Online learner + duration estimator for one quantity's actuator.
#[derive(Debug)]
pub struct Predictor {
    bucket_width: f32,
    increase: DirectionTable,
    decrease: DirectionTable,
    predict_min_ms: u64,
    predict_max_ms: u64,
    dirty: bool,
}

impl Predictor {
    /// `bucket_width` is in quantity units; `predict_min_ms`/`max` bound
    /// every non-zero prediction.
    pub fn new(bucket_width: f32, predict_min_ms: u64, predict_max_ms: u64) -> Self {
        Self {
            bucket_width,
            increase: DirectionTable::new(),
            decrease: DirectionTable::new(),
            predict_min_ms: predict_min_ms.min(predict_max_ms),
            predict_max_ms: predict_max_ms.max(predict_min_ms),
            dirty: false,
        }
    }

    /// Record one completed actuation outcome.
    ///
    /// Rejected outright: runs shorter than 1 ms, and outcomes whose
    /// observed direction contradicts the claimed one (the value moved
    /// the wrong way — that sample teaches nothing about the actuator).
    pub fn put(&mut self, value_from: f32, value_to: f32, elapsed_ms: u64, increased: bool) {
        if elapsed_ms < 1 {
            return;
        }
        if increased && value_to < value_from {
            return;
        }
        if !increased && value_to > value_from {
            return;
        }

        let Some(range) = self.bucket(value_from) else {
            return;
        };

        let efficiency = (value_to - value_from).abs() / (elapsed_ms as f32 / 100.0);

        if increased {
            self.increase.record(range, efficiency);
        } else {
            self.decrease.record(range, efficiency);
        }
        self.dirty = true;
    }

    /// Estimate the run duration (ms) needed to move `current` to
    /// `target`.
    ///
    /// Returns 0 when no actuation is warranted (already at the target,
    /// the change is negligible, or the start value falls outside the
    /// learnable range — the caller substitutes its configured default).
    /// With no learned data the midpoint of the clamp window is the
    /// guess; everything else is clamped into `[min, max]`.
    pub fn predict(&self, current: f32, target: f32) -> u64 {
        if current == target {
            return 0;
        }

        let needed = (target - current).abs();
        if needed < NEGLIGIBLE_CHANGE {
            return 0;
        }

        let Some(range) = self.bucket(current) else {
            return 0;
        };

        let efficiency = if target > current {
            self.increase.avg[range]
        } else {
            self.decrease.avg[range]
        };

        if efficiency == 0.0 {
            return u64::midpoint(self.predict_min_ms, self.predict_max_ms);
        }

        let estimate = (needed / efficiency * 100.0) as u64;
        estimate.clamp(self.predict_min_ms, self.predict_max_ms)
    }

    /// Bucket index for a starting value, if it is learnable.
    fn bucket(&self, value: f32) -> Option<usize> {
        if value < 0.0 || self.bucket_width <= 0.0 {
            return None;
        }

        let range = (value / self.bucket_width) as usize;
        (range < RANGE_COUNT).then_some(range)
    }

    // ── Persistence ───────────────────────────────────────────

    /// Snapshot the published bucket means.
    pub fn profile(&self) -> EfficiencyProfile {
        EfficiencyProfile {
            increase: self.increase.avg,
            decrease: self.decrease.avg,
        }
    }

    /// Seed the published means from a stored profile.  Sample rings
    /// start empty; fresh outcomes rebuild each bucket's mean.
    pub fn load_profile(&mut self, profile: &EfficiencyProfile) {
        self.increase.avg = profile.increase;
        self.decrease.avg = profile.decrease;
        self.dirty = false;
    }

    /// Unsaved learning since the last profile snapshot was persisted.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    pub fn predict_min_ms(&self) -> u64 {
        self.predict_min_ms
    }

    pub fn predict_max_ms(&self) -> u64 {
        self.predict_max_ms
    }

    pub fn set_predict_limits(&mut self, min_ms: u64, max_ms: u64) {
        self.predict_min_ms = min_ms.min(max_ms);
        self.predict_max_ms = max_ms.max(min_ms);
    }
}
