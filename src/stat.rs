use anyhow::Result;
use serde::Serialize;

use crate::probe::HostProbe;

/// Per-mount usage above this percent lands in `disk_warn`.
const DISK_WARN_THRESHOLD: f64 = 90.0;

/// One snapshot of host health, immutable once composed.
///
/// Field declaration order is the collector's wire order; the payload is
/// serialized exactly once and the authentication token is computed over
/// those bytes, so the collector can recompute it over what it receives.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatRecord {
    pub id: String,
    pub time_stamp: i64,
    pub host_name: String,
    pub os_release: String,
    pub cpu_name: String,
    pub cpu_core: u64,
    pub uptime: u64,
    pub load: String,
    pub cpu_rate: f64,
    pub mem_rate: f64,
    pub swap_rate: f64,
    /// Ratio in [0,1] across all mounts; the other rates are percent.
    /// The collector protocol keeps this mixed convention.
    pub disk_rate: f64,
    pub disk_warn: String,
    pub disk_read: u64,
    pub disk_write: u64,
    pub net_read: u64,
    pub net_write: u64,
}

impl StatRecord {
    /// The canonical serialization. Serde emits struct fields in
    /// declaration order, so repeated calls are byte-identical.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Build one StatRecord from the probe. Every probe reading may fail
/// independently; a failed reading contributes its zero value and the
/// report still goes out (a partial report beats no report).
pub fn compose(id: &str, display_name: &str, now: i64, probe: &dyn HostProbe) -> StatRecord {
    let host = zero_on_failure(probe.host_info());
    let cpu = zero_on_failure(probe.cpu_info());
    let mem = zero_on_failure(probe.mem());
    let disks = zero_on_failure(probe.disks());
    let io = zero_on_failure(probe.io());
    let net = zero_on_failure(probe.net());
    let load = zero_on_failure(probe.load());

    let host_name = if display_name.is_empty() {
        host.host_name
    } else {
        display_name.to_string()
    };

    let cpu_rate = match probe.cpu_idle() {
        Ok(idle) => round2(100.0 - idle),
        Err(_) => 0.0,
    };

    let mut disk_total = 0u64;
    let mut disk_used = 0u64;
    let mut disk_warn = String::new();
    for d in &disks {
        disk_total += d.total;
        disk_used += d.used;
        if d.used_rate > DISK_WARN_THRESHOLD {
            disk_warn.push_str(&format!("{} {:.2};", d.mount, d.used_rate));
        }
    }
    let disk_rate = if disk_total == 0 {
        0.0
    } else {
        round2(disk_used as f64 / disk_total as f64)
    };

    let disk_read: u64 = io.iter().map(|d| d.read_bytes).sum();
    let disk_write: u64 = io.iter().map(|d| d.write_bytes).sum();

    let mut net_read = 0u64;
    let mut net_write = 0u64;
    for n in &net {
        if is_loopback(&n.device) {
            continue;
        }
        net_read += n.rx_bytes;
        net_write += n.tx_bytes;
    }

    StatRecord {
        id: id.to_string(),
        time_stamp: now,
        host_name,
        os_release: host.os_release,
        cpu_name: cpu.model,
        cpu_core: cpu.cores,
        uptime: zero_on_failure(probe.uptime()),
        load: format!("{:.2} {:.2} {:.2}", load.one, load.five, load.fifteen),
        cpu_rate,
        mem_rate: round2(mem.mem_rate),
        swap_rate: round2(mem.swap_rate),
        disk_rate,
        disk_warn,
        disk_read: disk_read / 1024,
        disk_write: disk_write / 1024,
        net_read: net_read / 1024,
        net_write: net_write / 1024,
    }
}

/// The per-field degradation policy: a failed probe reading becomes the
/// zero value for that field.
fn zero_on_failure<T: Default>(reading: Result<T>) -> T {
    reading.unwrap_or_default()
}

fn is_loopback(device: &str) -> bool {
    device == "lo" || device == "lo0"
}

/// Round to 2 decimals, half away from zero.
fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
