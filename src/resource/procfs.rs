//! Process resource sampling through procfs.
//!
//! Reads:
//! - `/proc/self/status`: `VmRSS` for resident memory.
//! - `/proc/self/stat`: `utime` + `stime` clock ticks for CPU usage. CPU
//!   percent is the tick delta between two calls over the wall time between
//!   them, so the first call reports 0.
//!
//! On other platforms both metrics are unavailable, which the gate treats
//! as "no pressure".

use std::path::Path;
use std::time::Instant;

use crate::error::{RelayError, RelayResult};
use crate::resource::ResourceSampler;

const STATUS_PATH: &str = "/proc/self/status";
const STAT_PATH: &str = "/proc/self/stat";

/// Sampler for the current process.
#[derive(Debug)]
pub struct ProcfsSampler {
    clock_ticks_per_sec: f64,
    last_cpu: Option<(Instant, u64)>,
}

impl Default for ProcfsSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcfsSampler {
    pub fn new() -> Self {
        Self {
            clock_ticks_per_sec: clock_ticks_per_sec(),
            last_cpu: None,
        }
    }
}

impl ResourceSampler for ProcfsSampler {
    fn memory_used_mb(&mut self) -> RelayResult<f64> {
        let content = read_proc(STATUS_PATH, "memory")?;
        let kb = parse_vm_rss_kb(&content)
            .ok_or_else(|| RelayError::sampler("memory", "VmRSS not found"))?;
        Ok(kb as f64 / 1024.0)
    }

    fn cpu_percent(&mut self) -> RelayResult<f64> {
        let content = read_proc(STAT_PATH, "cpu")?;
        let ticks = parse_cpu_ticks(&content)
            .ok_or_else(|| RelayError::sampler("cpu", "malformed stat line"))?;
        let now = Instant::now();

        let percent = match self.last_cpu {
            Some((at, prev)) => {
                let wall = now.duration_since(at).as_secs_f64();
                if wall <= 0.0 {
                    0.0
                } else {
                    let cpu_secs = ticks.saturating_sub(prev) as f64 / self.clock_ticks_per_sec;
                    cpu_secs / wall * 100.0
                }
            }
            None => 0.0,
        };
        self.last_cpu = Some((now, ticks));
        Ok(percent)
    }
}

fn read_proc(path: &str, metric: &str) -> RelayResult<String> {
    if !cfg!(target_os = "linux") {
        return Err(RelayError::sampler(metric, "procfs not available on this platform"));
    }
    std::fs::read_to_string(Path::new(path))
        .map_err(|e| RelayError::sampler(metric, format!("cannot read {}: {}", path, e)))
}

#[cfg(target_os = "linux")]
fn clock_ticks_per_sec() -> f64 {
    // SAFETY: sysconf has no preconditions and only reads a constant.
    let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if ticks > 0 { ticks as f64 } else { 100.0 }
}

#[cfg(not(target_os = "linux"))]
fn clock_ticks_per_sec() -> f64 {
    100.0
}

/// `VmRSS` in kB from a `/proc/<pid>/status` document.
pub(crate) fn parse_vm_rss_kb(content: &str) -> Option<u64> {
    content
        .lines()
        .find_map(|line| line.strip_prefix("VmRSS:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|value| value.parse().ok())
}

/// `utime + stime` from a `/proc/<pid>/stat` line.
///
/// The command name (field 2) may contain spaces and parentheses, so fields
/// are counted from the last `)`.
pub(crate) fn parse_cpu_ticks(content: &str) -> Option<u64> {
    let after_comm = &content[content.rfind(')')? + 1..];
    let fields: Vec<&str> = after_comm.split_whitespace().collect();
    // fields[0] is `state` (field 3); utime and stime are fields 14 and 15
    let utime: u64 = fields.get(11)?.parse().ok()?;
    let stime: u64 = fields.get(12)?.parse().ok()?;
    Some(utime + stime)
}
