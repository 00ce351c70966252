//! Locating one-wire thermometers under the kernel's device directory.

use crate::config::DiscoveryConfig;
use crate::error::DiscoveryError;
use crate::sensors::SensorHandle;
use log::{debug, info};
use std::fs;
use std::path::Path;

/// Find every device whose name starts with `prefix` and that exposes `data_file`.
///
/// Handles are returned sorted by path.
pub fn discover(
    dir: &Path,
    prefix: &str,
    data_file: &str,
) -> Result<Vec<SensorHandle>, DiscoveryError> {
    let entries = fs::read_dir(dir).map_err(|source| DiscoveryError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut handles = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DiscoveryError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !name.starts_with(prefix) {
            continue;
        }

        let source = entry.path().join(data_file);
        if !source.is_file() {
            debug!("Skipping {}: no {}", name, data_file);
            continue;
        }
        handles.push(SensorHandle::new(source));
    }

    handles.sort();
    Ok(handles)
}

/// Discover sensors using the configured directory, prefix and data file.
pub fn discover_with(config: &DiscoveryConfig) -> Result<Vec<SensorHandle>, DiscoveryError> {
    discover(&config.devices_dir, &config.family_prefix, &config.data_file)
}

/// Discover exactly one sensor; zero or several is an error.
pub fn discover_single(config: &DiscoveryConfig) -> Result<SensorHandle, DiscoveryError> {
    let mut handles = discover_with(config)?;
    info!("Found {} temp sensors", handles.len());
    match handles.len() {
        0 => Err(DiscoveryError::NoSensors(config.devices_dir.clone())),
        1 => Ok(handles.remove(0)),
        n => Err(DiscoveryError::MultipleSensors(n)),
    }
}
