//! Temperature sensor reading and change notification.
//!
//! [`reader`] turns a one-wire sensor's raw sysfs output into a
//! [`Temperature`]; [`watcher`] polls any [`TemperatureSource`] on a fixed
//! interval and streams changed values and failures to a consumer.

pub mod reader;
pub mod watcher;

pub use reader::{SensorHandle, W1Sensor, parse_reading};
pub use watcher::{ChangeEvent, Watch, WatchControl, Watcher};

use crate::error::SensorError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use strum::{Display, EnumString};

/// Unit a [`Temperature`] is expressed in.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Celsius,
    #[default]
    Fahrenheit,
    Kelvin,
}

impl Unit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Celsius => "°C",
            Unit::Fahrenheit => "°F",
            Unit::Kelvin => "K",
        }
    }
}

/// A temperature value in a specific unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    pub value: f64,
    pub unit: Unit,
}

impl Temperature {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// Convert a raw reading in thousandths of a degree Celsius.
    pub fn from_millicelsius(raw: f64, unit: Unit) -> Self {
        let celsius = raw / 1000.0;
        let value = match unit {
            Unit::Celsius => celsius,
            Unit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
            Unit::Kelvin => celsius + 273.15,
        };
        Self { value, unit }
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.symbol())
    }
}

/// Anything that can produce a single temperature reading on demand.
///
/// Reads are synchronous and may block (a one-wire read waits for the
/// sensor's conversion), so the [`Watcher`] runs them on the blocking pool.
pub trait TemperatureSource: Send + Sync + 'static {
    fn read(&self) -> Result<Temperature, SensorError>;
}

impl<S: TemperatureSource> TemperatureSource for Arc<S> {
    fn read(&self) -> Result<Temperature, SensorError> {
        S::read(self)
    }
}
