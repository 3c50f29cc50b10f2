//! System resource introspection.
//!
//! The [`SystemProbe`] trait is the seam between the `sysinfo`/`ps` commands
//! and the operating system, so the commands can be tested with fixed data.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sysinfo::{System, Users};

/// Delay between the two CPU samples needed to compute usage.
const CPU_SAMPLE_INTERVAL: Duration = Duration::from_millis(200);

/// Machine-wide resource usage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    /// Global CPU usage in percent.
    pub cpu_percent: f32,
    /// Used memory in bytes.
    pub memory_used: u64,
    /// Total memory in bytes.
    pub memory_total: u64,
}

impl SystemSnapshot {
    /// Used memory as a percentage of total memory.
    pub fn memory_percent(&self) -> f64 {
        if self.memory_total == 0 {
            return 0.0;
        }
        self.memory_used as f64 * 100.0 / self.memory_total as f64
    }
}

/// One running process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    /// Owning user name, if it could be resolved.
    pub user: Option<String>,
    pub cpu_percent: f32,
    pub memory_percent: f64,
}

/// Source of system and process information.
pub trait SystemProbe: Send + Sync {
    /// Samples machine-wide CPU and memory usage.
    fn snapshot(&self) -> SystemSnapshot;

    /// Lists running processes in no particular order.
    fn processes(&self) -> Vec<ProcessInfo>;
}

/// [`SystemProbe`] backed by the `sysinfo` crate.
#[derive(Debug, Default)]
pub struct SysinfoProbe;

impl SysinfoProbe {
    pub fn new() -> Self {
        Self
    }
}

impl SystemProbe for SysinfoProbe {
    fn snapshot(&self) -> SystemSnapshot {
        let mut sys = System::new();
        sys.refresh_cpu();
        std::thread::sleep(CPU_SAMPLE_INTERVAL);
        sys.refresh_cpu();
        sys.refresh_memory();

        SystemSnapshot {
            cpu_percent: sys.global_cpu_info().cpu_usage(),
            memory_used: sys.used_memory(),
            memory_total: sys.total_memory(),
        }
    }

    fn processes(&self) -> Vec<ProcessInfo> {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_processes();
        std::thread::sleep(CPU_SAMPLE_INTERVAL);
        sys.refresh_processes();

        let users = Users::new_with_refreshed_list();
        let total = sys.total_memory();

        sys.processes()
            .values()
            .map(|process| ProcessInfo {
                pid: process.pid().as_u32(),
                name: process.name().to_string(),
                user: process
                    .user_id()
                    .and_then(|uid| users.get_user_by_id(uid))
                    .map(|user| user.name().to_string()),
                cpu_percent: process.cpu_usage(),
                memory_percent: if total == 0 {
                    0.0
                } else {
                    process.memory() as f64 * 100.0 / total as f64
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_percent_handles_zero_total() {
        let snapshot = SystemSnapshot {
            cpu_percent: 0.0,
            memory_used: 10,
            memory_total: 0,
        };
        assert_eq!(snapshot.memory_percent(), 0.0);
    }

    #[test]
    fn memory_percent_is_ratio_of_total() {
        let snapshot = SystemSnapshot {
            cpu_percent: 12.5,
            memory_used: 256,
            memory_total: 1024,
        };
        assert!((snapshot.memory_percent() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sysinfo_probe_reports_memory() {
        let snapshot = SysinfoProbe::new().snapshot();
        assert!(snapshot.memory_total > 0);
        assert!(snapshot.memory_used <= snapshot.memory_total);
    }

    #[test]
    fn sysinfo_probe_lists_current_process() {
        let pid = std::process::id();
        let processes = SysinfoProbe::new().processes();
        assert!(processes.iter().any(|p| p.pid == pid));
    }
}
