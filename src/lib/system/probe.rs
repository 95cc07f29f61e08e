use std::{
    fmt,
    path::Path,
    sync::{Mutex, MutexGuard},
};

use sysinfo::{
    CpuExt, DiskExt, NetworkExt, NetworksExt, PidExt, ProcessExt, System, SystemExt,
};
use tracing::*;

use super::{
    thermal::ThermalZones,
    types::{DiskUsage, HostInfo, MemoryUsage, NetworkCounters, ProcessSample},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Metric {
    Cpu,
    Memory,
    Disk,
    Network,
    Processes,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cpu => "CPU",
            Self::Memory => "memory",
            Self::Disk => "disk",
            Self::Network => "network",
            Self::Processes => "process",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Failed to read {metric} information: {reason}")]
    Unavailable { metric: Metric, reason: String },
}

impl MetricsError {
    pub fn unavailable(metric: Metric, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            metric,
            reason: reason.into(),
        }
    }
}

/// Source of the host metrics.
///
/// Queries are blocking and may take a while on busy hosts, callers inside
/// an async context should move them to a blocking thread.
pub trait SystemProbe: Send + Sync {
    /// Aggregate CPU usage since the previous call, across all cores
    fn cpu_usage(&self) -> Result<f64, MetricsError>;

    /// Best-effort CPU temperature in degrees Celsius
    fn cpu_temperature(&self) -> Option<f64>;

    fn memory(&self) -> Result<MemoryUsage, MetricsError>;

    fn disk(&self, mount_point: &Path) -> Result<DiskUsage, MetricsError>;

    fn network(&self) -> Result<Vec<NetworkCounters>, MetricsError>;

    fn processes(&self) -> Result<Vec<ProcessSample>, MetricsError>;

    fn host_info(&self) -> HostInfo;
}

/// [SystemProbe] backed by `sysinfo`.
///
/// The `System` is shared between requests so that CPU usage, both global
/// and per process, is computed against the previous refresh.
pub struct SysinfoProbe {
    system: Mutex<System>,
    thermal: ThermalZones,
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new(ThermalZones::default())
    }
}

impl SysinfoProbe {
    pub fn new(thermal: ThermalZones) -> Self {
        if !System::IS_SUPPORTED {
            warn!("This OS is not supported by sysinfo, metrics will be unavailable");
        }

        let mut system = System::new();
        // Prime the CPU counters, the first sample is always zero otherwise
        system.refresh_cpu();

        Self {
            system: Mutex::new(system),
            thermal,
        }
    }

    fn system(&self) -> MutexGuard<'_, System> {
        // Nothing can be left half-updated by a panicking refresh
        self.system
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_supported(metric: Metric) -> Result<(), MetricsError> {
        if System::IS_SUPPORTED {
            return Ok(());
        }

        Err(MetricsError::unavailable(metric, "unsupported operating system"))
    }
}

impl SystemProbe for SysinfoProbe {
    #[instrument(level = "trace", skip(self))]
    fn cpu_usage(&self) -> Result<f64, MetricsError> {
        Self::ensure_supported(Metric::Cpu)?;

        let mut system = self.system();
        system.refresh_cpu();

        if system.cpus().is_empty() {
            return Err(MetricsError::unavailable(Metric::Cpu, "no CPU was found"));
        }

        Ok(system.global_cpu_info().cpu_usage() as f64)
    }

    fn cpu_temperature(&self) -> Option<f64> {
        self.thermal.cpu_temperature()
    }

    #[instrument(level = "trace", skip(self))]
    fn memory(&self) -> Result<MemoryUsage, MetricsError> {
        Self::ensure_supported(Metric::Memory)?;

        let mut system = self.system();
        system.refresh_memory();

        let total = system.total_memory();
        if total == 0 {
            return Err(MetricsError::unavailable(
                Metric::Memory,
                "total memory reported as zero",
            ));
        }
        let used = system.used_memory();

        Ok(MemoryUsage {
            total,
            used,
            free: system.free_memory(),
            usage_percent: percent(used, total),
        })
    }

    #[instrument(level = "trace", skip(self))]
    fn disk(&self, mount_point: &Path) -> Result<DiskUsage, MetricsError> {
        Self::ensure_supported(Metric::Disk)?;

        let mut system = self.system();
        system.refresh_disks_list();

        let disk = system
            .disks()
            .iter()
            .find(|disk| disk.mount_point() == mount_point)
            .ok_or_else(|| {
                MetricsError::unavailable(
                    Metric::Disk,
                    format!("no disk mounted at {mount_point:?}"),
                )
            })?;

        let total = disk.total_space();
        let free = disk.available_space();
        let used = total.saturating_sub(free);

        Ok(DiskUsage {
            total,
            used,
            free,
            usage_percent: percent(used, total),
        })
    }

    #[instrument(level = "trace", skip(self))]
    fn network(&self) -> Result<Vec<NetworkCounters>, MetricsError> {
        Self::ensure_supported(Metric::Network)?;

        let mut system = self.system();
        system.refresh_networks_list();

        let counters = system
            .networks()
            .iter()
            .map(|(name, data)| NetworkCounters {
                name: name.clone(),
                bytes_sent: data.total_transmitted(),
                bytes_recv: data.total_received(),
                packets_sent: data.total_packets_transmitted(),
                packets_recv: data.total_packets_received(),
                errin: data.total_errors_on_received(),
                errout: data.total_errors_on_transmitted(),
            })
            .collect();

        Ok(counters)
    }

    #[instrument(level = "trace", skip(self))]
    fn processes(&self) -> Result<Vec<ProcessSample>, MetricsError> {
        Self::ensure_supported(Metric::Processes)?;

        let mut system = self.system();
        system.refresh_memory();
        system.refresh_processes();

        let total_memory = system.total_memory();

        let samples = system
            .processes()
            .iter()
            .map(|(pid, process)| {
                let name = Some(process.name().to_string()).filter(|name| !name.is_empty());
                let mem_percent =
                    (total_memory > 0).then(|| percent(process.memory(), total_memory));

                ProcessSample {
                    pid: pid.as_u32(),
                    name,
                    cpu_percent: Some(process.cpu_usage() as f64),
                    mem_percent,
                    status: Some(process.status().to_string()),
                }
            })
            .collect();

        Ok(samples)
    }

    fn host_info(&self) -> HostInfo {
        let system = self.system();

        HostInfo {
            host_name: system.host_name(),
            os: system.long_os_version(),
            kernel_version: system.kernel_version(),
            uptime_secs: system.uptime(),
        }
    }
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }

    part as f64 / total as f64 * 100.0
}
