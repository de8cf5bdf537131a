use anyhow::Result;
use sysinfo::{CpuRefreshKind, Disks, MemoryRefreshKind, Networks, RefreshKind, System};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostInfo {
    pub host_name: String,
    pub os_release: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuInfo {
    pub model: String,
    pub cores: u64,
}

/// Memory and swap utilization, percent in [0,100].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemStat {
    pub mem_rate: f64,
    pub swap_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiskStat {
    pub mount: String,
    pub total: u64,
    pub used: u64,
    /// Percent in [0,100] for this mount alone.
    pub used_rate: f64,
}

/// Cumulative I/O byte counters for one disk device.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IoStat {
    pub read_bytes: u64,
    pub write_bytes: u64,
}

/// Cumulative traffic byte counters for one network interface.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetStat {
    pub device: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadStat {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

/// Raw host facts feeding the stat composer. Each reading may fail on
/// its own; the composer substitutes zero values for failed readings
/// instead of aborting the report.
pub trait HostProbe {
    fn host_info(&self) -> Result<HostInfo>;
    fn cpu_info(&self) -> Result<CpuInfo>;
    /// CPU idle rate, percent in [0,100].
    fn cpu_idle(&self) -> Result<f64>;
    fn mem(&self) -> Result<MemStat>;
    fn disks(&self) -> Result<Vec<DiskStat>>;
    fn io(&self) -> Result<Vec<IoStat>>;
    fn net(&self) -> Result<Vec<NetStat>>;
    /// Seconds since boot.
    fn uptime(&self) -> Result<u64>;
    fn load(&self) -> Result<LoadStat>;
}

/// sysinfo-backed probe used by the real agent.
pub struct SystemProbe {
    sys: System,
}

impl SystemProbe {
    /// Takes two CPU samples separated by the minimum update interval so
    /// the usage reading has a delta to work from.
    pub fn new() -> Self {
        let refresh = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::everything())
            .with_memory(MemoryRefreshKind::everything());
        let mut sys = System::new_with_specifics(refresh);

        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        sys.refresh_cpu_usage();

        Self { sys }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HostProbe for SystemProbe {
    fn host_info(&self) -> Result<HostInfo> {
        let host_name =
            System::host_name().ok_or_else(|| anyhow::anyhow!("hostname unavailable"))?;
        let release = System::long_os_version()
            .or_else(System::os_version)
            .unwrap_or_default();
        let os_bit = if cfg!(target_pointer_width = "64") {
            "64bit"
        } else {
            "32bit"
        };

        Ok(HostInfo {
            host_name,
            os_release: format!("{} {}", release.trim(), os_bit),
        })
    }

    fn cpu_info(&self) -> Result<CpuInfo> {
        let cpus = self.sys.cpus();
        let first = cpus
            .first()
            .ok_or_else(|| anyhow::anyhow!("no CPUs reported"))?;

        Ok(CpuInfo {
            model: first.brand().trim().to_string(),
            cores: cpus.len() as u64,
        })
    }

    fn cpu_idle(&self) -> Result<f64> {
        let usage = self.sys.global_cpu_usage() as f64;
        Ok((100.0 - usage).clamp(0.0, 100.0))
    }

    fn mem(&self) -> Result<MemStat> {
        let mem_total = self.sys.total_memory();
        let mem_rate = if mem_total == 0 {
            0.0
        } else {
            self.sys.used_memory() as f64 / mem_total as f64 * 100.0
        };

        let swap_total = self.sys.total_swap();
        let swap_rate = if swap_total == 0 {
            0.0
        } else {
            self.sys.used_swap() as f64 / swap_total as f64 * 100.0
        };

        Ok(MemStat {
            mem_rate,
            swap_rate,
        })
    }

    fn disks(&self) -> Result<Vec<DiskStat>> {
        let disks = Disks::new_with_refreshed_list();
        let stats = disks
            .list()
            .iter()
            .filter(|d| d.total_space() > 0)
            .map(|d| {
                let total = d.total_space();
                let used = total.saturating_sub(d.available_space());
                DiskStat {
                    mount: d.mount_point().to_string_lossy().into_owned(),
                    total,
                    used,
                    used_rate: used as f64 / total as f64 * 100.0,
                }
            })
            .collect();

        Ok(stats)
    }

    fn io(&self) -> Result<Vec<IoStat>> {
        let disks = Disks::new_with_refreshed_list();
        let stats = disks
            .list()
            .iter()
            .map(|d| {
                let usage = d.usage();
                IoStat {
                    read_bytes: usage.total_read_bytes,
                    write_bytes: usage.total_written_bytes,
                }
            })
            .collect();

        Ok(stats)
    }

    fn net(&self) -> Result<Vec<NetStat>> {
        let networks = Networks::new_with_refreshed_list();
        let stats = networks
            .iter()
            .map(|(name, data)| NetStat {
                device: name.clone(),
                rx_bytes: data.total_received(),
                tx_bytes: data.total_transmitted(),
            })
            .collect();

        Ok(stats)
    }

    fn uptime(&self) -> Result<u64> {
        Ok(System::uptime())
    }

    fn load(&self) -> Result<LoadStat> {
        let avg = System::load_average();
        Ok(LoadStat {
            one: avg.one,
            five: avg.five,
            fifteen: avg.fifteen,
        })
    }
}
