use serde::{Deserialize, Serialize};

/// Snapshot of the host resources, recomputed on every request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub cpu: CpuStatus,
    pub memory: MemoryUsage,
    pub disk: DiskUsage,
    pub network: Vec<NetworkCounters>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuStatus {
    pub usage_percent: f64,
    /// Degrees Celsius, zero when no CPU sensor could be read
    pub temperature: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub usage_percent: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskUsage {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub usage_percent: f64,
}

/// Cumulative I/O counters of a single network interface.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkCounters {
    pub name: String,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub errin: u64,
    pub errout: u64,
}

/// What the probe reports for one process. Every field but the pid is
/// optional since each of them is fetched independently.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProcessSample {
    pub pid: u32,
    pub name: Option<String>,
    pub cpu_percent: Option<f64>,
    pub mem_percent: Option<f64>,
    pub status: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f64,
    pub mem_percent: f64,
    pub status: String,
}

impl From<ProcessSample> for ProcessInfo {
    fn from(sample: ProcessSample) -> Self {
        Self {
            pid: sample.pid,
            name: sample.name.unwrap_or_default(),
            cpu_percent: sample.cpu_percent.unwrap_or_default(),
            mem_percent: sample.mem_percent.unwrap_or_default(),
            status: sample.status.unwrap_or_default(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HostInfo {
    pub host_name: Option<String>,
    pub os: Option<String>,
    pub kernel_version: Option<String>,
    pub uptime_secs: u64,
}
