use std::path::Path;

use tracing::*;

use super::{
    probe::{MetricsError, SystemProbe},
    types::{CpuStatus, ProcessInfo, SystemStatus},
};

/// Only the root filesystem is reported
pub const ROOT_MOUNT_POINT: &str = "/";

/// Collect a full [SystemStatus].
///
/// CPU, memory, disk and network are all mandatory: the first one that fails
/// aborts the whole snapshot. The temperature is optional and reported as
/// zero when no sensor is available.
#[instrument(level = "debug", skip(probe))]
pub fn system_status(probe: &dyn SystemProbe) -> Result<SystemStatus, MetricsError> {
    let usage_percent = probe.cpu_usage()?;
    let temperature = probe.cpu_temperature().unwrap_or_default();
    let memory = probe.memory()?;
    let disk = probe.disk(Path::new(ROOT_MOUNT_POINT))?;
    let network = probe.network()?;

    Ok(SystemStatus {
        cpu: CpuStatus {
            usage_percent,
            temperature,
        },
        memory,
        disk,
        network,
    })
}

/// List every process visible to us.
///
/// A process whose details could not be fetched is still listed, with empty
/// fields. The order is whatever the OS enumeration gives.
#[instrument(level = "debug", skip(probe))]
pub fn list_processes(probe: &dyn SystemProbe) -> Result<Vec<ProcessInfo>, MetricsError> {
    let processes: Vec<ProcessInfo> = probe
        .processes()?
        .into_iter()
        .map(ProcessInfo::from)
        .collect();

    debug!("Listed {} processes", processes.len());

    Ok(processes)
}
