use std::path::{Path, PathBuf};

use tracing::*;

pub const DEFAULT_THERMAL_ROOT: &str = "/sys/class/thermal";

/// Sensor labels that identify a CPU thermal zone
const CPU_ZONE_LABELS: [&str; 3] = ["cpu", "core", "thermal"];

/// Linux thermal zones, as exposed under `/sys/class/thermal/thermal_zone*`.
#[derive(Clone, Debug)]
pub struct ThermalZones {
    root: PathBuf,
}

impl Default for ThermalZones {
    fn default() -> Self {
        Self::new(DEFAULT_THERMAL_ROOT)
    }
}

impl ThermalZones {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Temperature of the first CPU-labelled zone that can be read, in degrees Celsius.
    #[instrument(level = "trace", skip(self))]
    pub fn cpu_temperature(&self) -> Option<f64> {
        let zones = match self.zones() {
            Ok(zones) => zones,
            Err(error) => {
                trace!("Thermal zones unavailable at {:?}: {error}", self.root);
                return None;
            }
        };

        let temperature = zones
            .iter()
            .filter(|zone| is_cpu_zone(zone))
            .find_map(|zone| read_temperature(zone));

        if temperature.is_none() {
            debug!("No readable CPU thermal zone found under {:?}", self.root);
        }

        temperature
    }

    fn zones(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut zones: Vec<PathBuf> = std::fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with("thermal_zone")
            })
            .map(|entry| entry.path())
            .collect();

        zones.sort();

        Ok(zones)
    }
}

fn is_cpu_zone(zone: &Path) -> bool {
    let Ok(label) = std::fs::read_to_string(zone.join("type")) else {
        return false;
    };
    let label = label.to_lowercase();

    CPU_ZONE_LABELS.iter().any(|name| label.contains(name))
}

fn read_temperature(zone: &Path) -> Option<f64> {
    let raw = std::fs::read_to_string(zone.join("temp")).ok()?;

    match raw.trim().parse::<f64>() {
        // Reported in millidegrees Celsius
        Ok(millidegrees) => Some(millidegrees / 1000.0),
        Err(error) => {
            trace!("Ignoring unparsable temperature {raw:?} in {zone:?}: {error}");
            None
        }
    }
}
