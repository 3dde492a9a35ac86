//! Regulated quantities.
//!
//! Every per-quantity table in the crate (readings, alerts, learned
//! efficiency profiles) is a flat array indexed by [`Quantity`].  This
//! replaces pointer-based cross-references between components: a
//! component that needs "the humidity alert" holds a `Quantity`, not a
//! reference into another object.

/// One of the three regulated environmental quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Quantity {
    Temperature = 0,
    Humidity = 1,
    Co2 = 2,
}

impl Quantity {
    /// Total number of quantities — used to size the table arrays.
    pub const COUNT: usize = 3;

    /// All quantities, in table order.
    pub const ALL: [Self; Self::COUNT] = [Self::Temperature, Self::Humidity, Self::Co2];

    /// Convert a table index back to a `Quantity`.  Panics on
    /// out-of-range in debug builds; returns `Temperature` in release
    /// (safe fallback).
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Temperature,
            1 => Self::Humidity,
            2 => Self::Co2,
            _ => {
                debug_assert!(false, "invalid quantity index: {idx}");
                Self::Temperature
            }
        }
    }

    /// Display name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Temperature => "Temperature",
            Self::Humidity => "Humidity",
            Self::Co2 => "CO2",
        }
    }

    /// Measurement unit, shown after the value.
    pub const fn unit(self) -> &'static str {
        match self {
            Self::Temperature => "°C",
            Self::Humidity => "%",
            Self::Co2 => "ppm",
        }
    }
}
