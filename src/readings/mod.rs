//! Reading pipeline: raw sample → offset → smoothing → published value.
//!
//! A [`Reading`] is the single value the rest of the system sees for one
//! quantity at one location.  Non-finite raw samples are dropped
//! silently, leaving the last published value in place — a single bad
//! bus transaction must not ripple into the control policy.

pub mod stack;
pub mod stat;

use stack::SmoothingStack;
use stat::TrendStat;

use crate::compare;

/// How a reading's measurement accuracy is derived.
///
/// Most sensors have a flat datasheet accuracy; the MH-Z19 CO2 sensor's
/// error grows with the reading (±50 ppm ± 5 % of value).
#[derive(Debug, Clone, Copy)]
pub enum AccuracyModel {
    Fixed(f32),
    Proportional { base: f32, factor: f32 },
}

impl AccuracyModel {
    fn resolve(self, value: f32) -> f32 {
        match self {
            Self::Fixed(a) => a,
            Self::Proportional { base, factor } => base + factor * value,
        }
    }
}

/// A smoothed, offset-adjusted scalar value with measurement accuracy.
#[derive(Debug)]
pub struct Reading {
    value: f32,
    offset: f32,
    accuracy: AccuracyModel,
    prefix: &'static str,
    postfix: &'static str,

    pub stack: SmoothingStack,
    pub stat: TrendStat,
}

impl Reading {
    pub fn new(accuracy: AccuracyModel, postfix: &'static str, window: usize) -> Self {
        Self {
            value: 0.0,
            offset: 0.0,
            accuracy,
            prefix: "",
            postfix,
            stack: SmoothingStack::new(window),
            stat: TrendStat::default(),
        }
    }

    /// Feed one raw sample through the pipeline.
    ///
    /// Non-finite samples are dropped; the previous value stays
    /// published.
    pub fn put_value(&mut self, raw: f32, now_ms: u64) {
        if !raw.is_finite() {
            return;
        }

        self.value = self.stack.put(raw + self.offset);
        self.stat.put_value(self.value, now_ms);
    }

    /// Current published value.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Current measurement accuracy (may depend on the value).
    pub fn accuracy(&self) -> f32 {
        self.accuracy.resolve(self.value)
    }

    /// Reset the published value and all accumulated state.
    pub fn clear(&mut self) {
        self.value = 0.0;
        self.stack.clear();
        self.stat.clear();
    }

    // ── Calibration / settings ────────────────────────────────

    pub fn set_offset(&mut self, offset: f32) {
        self.offset = offset;
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn set_accuracy(&mut self, accuracy: AccuracyModel) {
        self.accuracy = accuracy;
    }

    pub fn set_hysteresis(&mut self, value: f32) {
        self.stat.set_hysteresis(value);
    }

    /// Destructive: resets the smoothing window contents.
    pub fn set_smoothing_window(&mut self, size: usize) {
        self.stack.set_size(size);
    }

    // ── Display ───────────────────────────────────────────────

    pub fn set_prefix(&mut self, prefix: &'static str) {
        self.prefix = prefix;
    }

    /// Human-readable "prefix value postfix" rendering.
    pub fn text(&self) -> String {
        let mut out = String::new();
        if !self.prefix.is_empty() {
            out.push_str(self.prefix);
            out.push(' ');
        }
        out.push_str(&format!("{:.1}", self.value));
        if !self.postfix.is_empty() {
            out.push(' ');
            out.push_str(self.postfix);
        }
        out
    }

    // ── Tolerance comparison against another reading ──────────

    /// Comparator-greater: exceeds `other` beyond combined tolerance.
    pub fn is_greater_than(&self, other: &Reading) -> bool {
        compare::is_greater(self.value, self.accuracy(), other.value, other.accuracy())
    }

    /// Not comparator-greater than `other`.
    pub fn is_smaller_or_equal(&self, other: &Reading) -> bool {
        compare::is_smaller_or_equal(self.value, self.accuracy(), other.value, other.accuracy())
    }

    // ── Trend shortcuts used by the alert policy ──────────────

    pub fn is_up(&self, now_ms: u64, period_ms: u64) -> bool {
        self.stat.is_up(now_ms, period_ms)
    }

    pub fn is_down(&self, now_ms: u64, period_ms: u64) -> bool {
        self.stat.is_down(now_ms, period_ms)
    }

    pub fn up_by(&self) -> f32 {
        self.stat.up_by()
    }

    pub fn down_by(&self) -> f32 {
        self.stat.down_by()
    }
}
