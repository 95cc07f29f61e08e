//! Host metrics: CPU, memory, disk, network, processes and thermal sensors.

pub mod collector;
pub mod fake_probe;
pub mod probe;
pub mod thermal;
pub mod types;

pub use collector::{list_processes, system_status};
pub use probe::{Metric, MetricsError, SysinfoProbe, SystemProbe};
