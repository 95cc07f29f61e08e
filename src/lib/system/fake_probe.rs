use std::path::Path;

use super::{
    probe::{Metric, MetricsError, SystemProbe},
    types::{DiskUsage, HostInfo, MemoryUsage, NetworkCounters, ProcessSample},
};

/// A [SystemProbe] that reports canned values, used to exercise the API
/// without depending on the host it runs on.
#[derive(Clone, Debug, Default)]
pub struct FakeProbe {
    pub cpu_usage: f64,
    pub temperature: Option<f64>,
    pub memory: MemoryUsage,
    pub disk: DiskUsage,
    pub network: Vec<NetworkCounters>,
    pub processes: Vec<ProcessSample>,
    pub host: HostInfo,
    /// Metric whose query fails
    pub failing: Option<Metric>,
}

impl FakeProbe {
    pub fn failing(mut self, metric: Metric) -> Self {
        self.failing = Some(metric);
        self
    }

    fn check(&self, metric: Metric) -> Result<(), MetricsError> {
        if self.failing == Some(metric) {
            return Err(MetricsError::unavailable(metric, "fake failure"));
        }

        Ok(())
    }
}

impl SystemProbe for FakeProbe {
    fn cpu_usage(&self) -> Result<f64, MetricsError> {
        self.check(Metric::Cpu)?;
        Ok(self.cpu_usage)
    }

    fn cpu_temperature(&self) -> Option<f64> {
        self.temperature
    }

    fn memory(&self) -> Result<MemoryUsage, MetricsError> {
        self.check(Metric::Memory)?;
        Ok(self.memory.clone())
    }

    fn disk(&self, _mount_point: &Path) -> Result<DiskUsage, MetricsError> {
        self.check(Metric::Disk)?;
        Ok(self.disk.clone())
    }

    fn network(&self) -> Result<Vec<NetworkCounters>, MetricsError> {
        self.check(Metric::Network)?;
        Ok(self.network.clone())
    }

    fn processes(&self) -> Result<Vec<ProcessSample>, MetricsError> {
        self.check(Metric::Processes)?;
        Ok(self.processes.clone())
    }

    fn host_info(&self) -> HostInfo {
        self.host.clone()
    }
}
