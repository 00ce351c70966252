//! One-wire thermometer polling.
//!
//! Reads DS18B20-style sensors through the kernel's sysfs interface and
//! streams changed temperatures, with read failures reported separately.

pub mod config;
pub mod discovery;
pub mod error;
pub mod sensors;

pub use error::{Error, Result};
pub use sensors::{ChangeEvent, SensorHandle, Temperature, TemperatureSource, Unit, W1Sensor, Watcher};
