//! Single-shot reads of a one-wire thermometer's sysfs data file.
//!
//! The kernel's `w1_slave` file holds two lines: a CRC status line ending in
//! `YES` once the conversion is complete, and a data line ending in
//! `t=<millidegrees Celsius>`:
//!
//! ```text
//! 72 01 4b 46 7f ff 0e 10 57 : crc=57 YES
//! 72 01 4b 46 7f ff 0e 10 57 t=23125
//! ```

use super::{Temperature, TemperatureSource, Unit};
use crate::error::{MalformedData, SensorError};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static DATA_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*t=(-?[0-9]*)$").expect("data line pattern is valid"));

const READY_FLAG: &str = "YES";

/// Location of a sensor's raw data file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SensorHandle {
    path: PathBuf,
}

impl SensorHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Device id, taken from the directory holding the data file (e.g. `28-0316a2795aff`).
    pub fn device_id(&self) -> Option<&str> {
        self.path.parent()?.file_name()?.to_str()
    }
}

/// Parse raw sensor output into millidegrees Celsius.
pub fn parse_reading(content: &str) -> Result<f64, SensorError> {
    let lines: Vec<&str> = content.split('\n').filter(|l| !l.is_empty()).collect();

    let Some(status) = lines.first() else {
        return Err(MalformedData::LineCount(0).into());
    };
    if !status.ends_with(READY_FLAG) {
        return Err(SensorError::NotReady);
    }
    if lines.len() != 2 {
        return Err(MalformedData::LineCount(lines.len()).into());
    }

    let data = lines[1];
    let raw = DATA_LINE
        .captures(data)
        .and_then(|caps| caps.get(1))
        .ok_or_else(|| MalformedData::InvalidDataLine(data.to_string()))?
        .as_str();

    raw.parse::<f64>()
        .map_err(|_| MalformedData::InvalidValue(raw.to_string()).into())
}

/// A one-wire thermometer read through sysfs.
#[derive(Debug, Clone)]
pub struct W1Sensor {
    handle: SensorHandle,
    unit: Unit,
}

impl W1Sensor {
    /// Create a sensor reporting in Fahrenheit.
    pub fn new(handle: SensorHandle) -> Self {
        Self::with_unit(handle, Unit::Fahrenheit)
    }

    pub fn with_unit(handle: SensorHandle, unit: Unit) -> Self {
        Self { handle, unit }
    }

    pub fn handle(&self) -> &SensorHandle {
        &self.handle
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    /// Read, validate and convert the current temperature.
    pub fn read(&self) -> Result<Temperature, SensorError> {
        let path = self.handle.path();
        let bytes = fs::read(path).map_err(|source| SensorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let raw = parse_reading(&String::from_utf8_lossy(&bytes))?;
        Ok(Temperature::from_millicelsius(raw, self.unit))
    }
}

impl TemperatureSource for W1Sensor {
    fn read(&self) -> Result<Temperature, SensorError> {
        W1Sensor::read(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = "72 01 4b 46 7f ff 0e 10 57 : crc=57 YES\n72 01 4b 46 7f ff 0e 10 57 t=23125\n";

    fn write_sensor(dir: &TempDir, content: &str) -> SensorHandle {
        let device = dir.path().join("28-0316a2795aff");
        fs::create_dir_all(&device).unwrap();
        let path = device.join("w1_slave");
        fs::write(&path, content).unwrap();
        SensorHandle::new(path)
    }

    #[test]
    fn test_parse_valid_reading() {
        assert_eq!(parse_reading(SAMPLE).unwrap(), 23125.0);
    }

    #[test]
    fn test_parse_negative_reading() {
        assert_eq!(parse_reading(" YES\nt=-5000\n").unwrap(), -5000.0);
    }

    #[test]
    fn test_trailing_blank_lines_are_ignored() {
        assert_eq!(parse_reading(" YES\n\nt=1000\n\n\n").unwrap(), 1000.0);
    }

    #[test]
    fn test_not_ready_regardless_of_content() {
        let content = "72 01 4b 46 7f ff 0e 10 57 : crc=57 NO\n72 01 4b 46 7f ff 0e 10 57 t=23125\n";
        assert!(matches!(parse_reading(content), Err(SensorError::NotReady)));

        // Readiness is checked before the line count.
        assert!(matches!(parse_reading("NO\n"), Err(SensorError::NotReady)));
        assert!(matches!(
            parse_reading("u\nt=23125YES\n23 01 4b 46 7f ff 0c 10 70 t=23125\n"),
            Err(SensorError::NotReady)
        ));
    }

    #[test]
    fn test_wrong_line_count() {
        let three = "crc=70 YES\nt=23125YES\n23 01 4b 46 7f ff 0c 10 70 t=23125\n";
        assert!(matches!(
            parse_reading(three),
            Err(SensorError::MalformedData(MalformedData::LineCount(3)))
        ));
        assert!(matches!(
            parse_reading("crc=70 YES\n"),
            Err(SensorError::MalformedData(MalformedData::LineCount(1)))
        ));
        assert!(matches!(
            parse_reading("\n\n"),
            Err(SensorError::MalformedData(MalformedData::LineCount(0)))
        ));
    }

    #[test]
    fn test_invalid_data_line() {
        assert!(matches!(
            parse_reading("YES\n72 01 4b 46 7f ff 0e 10 57\n"),
            Err(SensorError::MalformedData(MalformedData::InvalidDataLine(_)))
        ));
        assert!(matches!(
            parse_reading("YES\nt=23125 \n"),
            Err(SensorError::MalformedData(MalformedData::InvalidDataLine(_)))
        ));
    }

    #[test]
    fn test_invalid_data_value() {
        assert!(matches!(
            parse_reading("YES\nt=\n"),
            Err(SensorError::MalformedData(MalformedData::InvalidValue(v))) if v.is_empty()
        ));
        assert!(matches!(
            parse_reading("YES\nt=-\n"),
            Err(SensorError::MalformedData(MalformedData::InvalidValue(v))) if v == "-"
        ));
    }

    #[test]
    fn test_read_converts_to_fahrenheit() {
        let dir = TempDir::new().unwrap();
        let handle = write_sensor(&dir, SAMPLE);
        let sensor = W1Sensor::new(handle.clone());
        assert_eq!(sensor.handle(), &handle);
        assert_eq!(sensor.unit(), Unit::Fahrenheit);

        let t = sensor.read().unwrap();
        assert_eq!(t.unit, Unit::Fahrenheit);
        assert!((t.value - (23125.0 / 1000.0 * 9.0 / 5.0 + 32.0)).abs() < 1e-9);
    }

    #[test]
    fn test_read_with_unit() {
        let dir = TempDir::new().unwrap();
        let sensor = W1Sensor::with_unit(write_sensor(&dir, " YES\nt=-5000\n"), Unit::Celsius);
        assert_eq!(sensor.unit(), Unit::Celsius);
        assert_eq!(sensor.read().unwrap(), Temperature::new(-5.0, Unit::Celsius));
    }

    #[test]
    fn test_read_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("28-gone").join("w1_slave");
        let sensor = W1Sensor::new(SensorHandle::new(&path));

        match sensor.read() {
            Err(SensorError::Io { path: p, source }) => {
                assert_eq!(p, path);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected I/O failure, got {:?}", other),
        }
    }

    #[test]
    fn test_device_id() {
        let handle = SensorHandle::new("/sys/bus/w1/devices/28-0316a2795aff/w1_slave");
        assert_eq!(handle.device_id(), Some("28-0316a2795aff"));
    }
}
