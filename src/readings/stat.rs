//! Trend and change-detection statistics for one reading.
//!
//! Accumulation only runs while an alert episode is active — the
//! orchestration layer enables the tracker when an alarm fires and
//! disables it when the alarm clears, so everything here is "since the
//! episode started (or since the last `reload`)".
//!
//! Change detection is hysteresis-filtered: a *change event* is recorded
//! only when the value has moved more than the hysteresis away from the
//! previous change event's value.  A *revert* is the special case where
//! the new movement's sign differs from the previous one — the trend
//! turned around.

use log::debug;

/// The most recent hysteresis-filtered movement.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeEvent {
    pub old: f32,
    pub new: f32,
    pub diff: f32,
    pub at_ms: u64,
    pub valid: bool,
}

impl ChangeEvent {
    fn record(old: f32, new: f32, diff: f32, at_ms: u64) -> Self {
        Self { old, new, diff, at_ms, valid: true }
    }
}

/// Returned by [`TrendStat::put_value`] when the sample produced a
/// change event.  Consumed synchronously by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Movement {
    pub old: f32,
    pub new: f32,
    pub diff: f32,
    /// The movement's sign differs from the previous change event's.
    pub reverted: bool,
}

/// Per-reading trend tracker.
#[derive(Debug, Default)]
pub struct TrendStat {
    hysteresis: f32,
    enabled: bool,

    /// First/last accepted sample and timestamps since `reload`.
    pub from_ms: u64,
    pub to_ms: u64,
    pub duration_ms: u64,
    pub value_from: f32,
    pub value_to: f32,

    /// Running extrema with the timestamps at which they were reached.
    pub min: f32,
    pub max: f32,
    pub min_at_ms: u64,
    pub max_at_ms: u64,

    /// Net movement since `reload`, and the same gated by hysteresis.
    pub diff: f32,
    pub diff_hysteresis: f32,

    /// Total swing (`max - min`) and its share of the maximum.
    pub total_diff: f32,
    pub total_diff_percent: f32,

    pub sum: f32,
    pub avg: f32,

    /// Cumulative hysteresis-filtered movement, per direction.
    /// Both totals are positive magnitudes.
    pub increase_total: f32,
    pub decrease_total: f32,

    pub count: u64,
    pub valid: bool,

    pub change: ChangeEvent,
    pub revert: ChangeEvent,
}

impl TrendStat {
    pub fn new(hysteresis: f32) -> Self {
        Self { hysteresis, ..Self::default() }
    }

    /// Reset every accumulator.  Enabled/hysteresis settings survive.
    pub fn clear(&mut self) {
        let hysteresis = self.hysteresis;
        let enabled = self.enabled;
        *self = Self::default();
        self.hysteresis = hysteresis;
        self.enabled = enabled;
    }

    /// Restart accumulation from the next sample.
    pub fn reload(&mut self) {
        self.clear();
    }

    /// Feed one smoothed sample.
    ///
    /// No-op while disabled or for non-finite values.  Returns the
    /// change event produced by this sample, if any.
    pub fn put_value(&mut self, value: f32, now_ms: u64) -> Option<Movement> {
        if !self.enabled || !value.is_finite() {
            return None;
        }

        // The running sum would leave the representable range: reset the
        // whole accumulator rather than publish garbage.
        if (value > 0.0 && self.sum > f32::MAX - value)
            || (value < 0.0 && self.sum < f32::MIN - value)
        {
            self.clear();
        }

        self.count += 1;

        if !self.valid {
            self.from_ms = now_ms;
            self.value_from = value;
            self.min = value;
            self.max = value;
        }

        self.to_ms = now_ms;
        self.value_to = value;
        self.duration_ms = self.to_ms.saturating_sub(self.from_ms);

        if value < self.min {
            self.min = value;
            self.min_at_ms = now_ms;
        }
        if value > self.max {
            self.max = value;
            self.max_at_ms = now_ms;
        }

        self.diff = self.value_to - self.value_from;
        self.diff_hysteresis = if self.diff.abs() > self.hysteresis {
            self.diff
        } else {
            0.0
        };

        self.total_diff = self.max - self.min;
        self.total_diff_percent = if self.max != 0.0 {
            self.total_diff * (100.0 / self.max)
        } else {
            0.0
        };

        self.sum += value;
        self.avg = self.sum / self.count as f32;

        let movement = if self.valid {
            self.detect_change(value, now_ms)
        } else {
            // Seed the change reference with the first sample.
            self.change.new = value;
            None
        };

        self.valid = true;
        movement
    }

    fn detect_change(&mut self, value: f32, now_ms: u64) -> Option<Movement> {
        let diff = value - self.change.new;
        if diff.abs() <= self.hysteresis {
            return None;
        }

        let reverted = self.change.valid && (self.change.diff * diff) < 0.0;
        if reverted {
            self.revert = ChangeEvent::record(self.change.new, value, diff, now_ms);
        }

        if diff > 0.0 {
            self.increase_total += diff;
        } else {
            self.decrease_total += -diff;
        }

        let old = self.change.new;
        self.change = ChangeEvent::record(old, value, diff, now_ms);

        Some(Movement { old, new: value, diff, reverted })
    }

    // ── Trend queries ─────────────────────────────────────────

    /// Last change event was upward, optionally within `period_ms`.
    /// A period of 0 means "at any time since reload".
    pub fn is_up(&self, now_ms: u64, period_ms: u64) -> bool {
        self.change.valid
            && self.change.diff > 0.0
            && (period_ms == 0 || now_ms.saturating_sub(self.change.at_ms) <= period_ms)
    }

    /// Last change event was downward, optionally within `period_ms`.
    pub fn is_down(&self, now_ms: u64, period_ms: u64) -> bool {
        self.change.valid
            && self.change.diff < 0.0
            && (period_ms == 0 || now_ms.saturating_sub(self.change.at_ms) <= period_ms)
    }

    /// Net upward movement since reload (0 when flat or falling).
    pub fn up_by(&self) -> f32 {
        if self.valid && self.diff > 0.0 { self.diff } else { 0.0 }
    }

    /// Net downward movement since reload (0 when flat or rising).
    pub fn down_by(&self) -> f32 {
        if self.valid && self.diff < 0.0 { -self.diff } else { 0.0 }
    }

    // ── Settings ──────────────────────────────────────────────

    pub fn set_hysteresis(&mut self, value: f32) {
        self.hysteresis = value;
    }

    pub fn hysteresis(&self) -> f32 {
        self.hysteresis
    }

    /// Enable or disable accumulation.  Enabling starts a fresh episode.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }

        if enabled {
            self.clear();
        }
        self.enabled = enabled;
        debug!("trend stat enabled = {enabled}");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}
