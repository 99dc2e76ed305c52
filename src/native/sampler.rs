use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};

use crate::core::{
    domain::ResourceSample,
    errors::MeasureError,
    traits::probe::{ProcessProbe, ProcessStat},
};

#[derive(Clone, Debug)]
pub struct ProcfsProbe {
    proc_root: PathBuf,
    ticks_per_sec: u64,
    page_size: u64,
}

impl Default for ProcfsProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcfsProbe {
    pub fn new() -> Self {
        // SAFETY: sysconf only reads process-wide configuration.
        let (ticks, page) = unsafe {
            (
                libc::sysconf(libc::_SC_CLK_TCK),
                libc::sysconf(libc::_SC_PAGESIZE),
            )
        };
        Self {
            proc_root: PathBuf::from("/proc"),
            ticks_per_sec: if ticks > 0 { ticks as u64 } else { 100 },
            page_size: if page > 0 { page as u64 } else { 4096 },
        }
    }
}

impl ProcessProbe for ProcfsProbe {
    fn read(&self, pid: u32) -> Option<ProcessStat> {
        let dir = self.proc_root.join(pid.to_string());
        let stat = std::fs::read_to_string(dir.join("stat")).ok()?;
        let statm = std::fs::read_to_string(dir.join("statm")).ok()?;

        let ticks = parse_cpu_ticks(&stat)?;
        let pages = parse_resident_pages(&statm)?;

        Some(ProcessStat {
            cpu_time: Duration::from_secs_f64(ticks as f64 / self.ticks_per_sec as f64),
            rss_bytes: pages * self.page_size,
        })
    }
}

/// utime + stime from `/proc/<pid>/stat`. Zombies count as exited.
fn parse_cpu_ticks(stat: &str) -> Option<u64> {
    // The command name may contain spaces and parentheses; fields are
    // counted from the last closing parenthesis.
    let rest = &stat[stat.rfind(')')? + 1..];
    let fields: Vec<&str> = rest.split_whitespace().collect();
    if matches!(fields.first(), Some(&"Z") | Some(&"X") | None) {
        return None;
    }
    let utime: u64 = fields.get(11)?.parse().ok()?;
    let stime: u64 = fields.get(12)?.parse().ok()?;
    Some(utime + stime)
}

fn parse_resident_pages(statm: &str) -> Option<u64> {
    statm.split_whitespace().nth(1)?.parse().ok()
}

pub fn sample_between(
    previous: &ProcessStat,
    current: &ProcessStat,
    elapsed: Duration,
) -> ResourceSample {
    let cpu_secs = current.cpu_time.saturating_sub(previous.cpu_time).as_secs_f64();
    let elapsed_secs = elapsed.as_secs_f64();
    let cpu_percent = if elapsed_secs > 0.0 {
        cpu_secs / elapsed_secs * 100.0
    } else {
        0.0
    };

    ResourceSample::new(cpu_percent, current.rss_bytes as f64 / 1024.0 / 1024.0)
}

#[derive(Debug)]
pub struct SamplerHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<Vec<ResourceSample>>,
}

impl SamplerHandle {
    pub fn spawn(pid: u32, probe: Arc<dyn ProcessProbe>, interval: Duration) -> Self {
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(sample_loop(pid, probe, interval, stop_rx));
        Self {
            stop_tx: Some(stop_tx),
            task,
        }
    }

    pub async fn finish(mut self) -> Result<Vec<ResourceSample>, MeasureError> {
        if let Some(stop_tx) = self.stop_tx.take() {
            // The loop may already have ended on its own.
            let _ = stop_tx.send(());
        }
        (&mut self.task).await.map_err(|e| MeasureError::Sampler {
            msg: e.to_string(),
        })
    }
}

impl Drop for SamplerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn sample_loop(
    pid: u32,
    probe: Arc<dyn ProcessProbe>,
    interval: Duration,
    mut stop_rx: oneshot::Receiver<()>,
) -> Vec<ResourceSample> {
    let mut samples = Vec::new();
    let Some(mut previous) = probe.read(pid) else {
        tracing::debug!(pid, "Process exited before the first sample");
        return samples;
    };
    let mut previous_at = Instant::now();

    loop {
        let stopping = tokio::select! {
            _ = &mut stop_rx => true,
            _ = tokio::time::sleep(interval) => false,
        };

        let Some(current) = probe.read(pid) else {
            break;
        };
        let now = Instant::now();
        samples.push(sample_between(&previous, &current, now - previous_at));
        previous = current;
        previous_at = now;

        if stopping {
            break;
        }
    }

    tracing::debug!(pid, count = samples.len(), "Sampling finished");
    samples
}

#[cfg(test)]
mod tests {
    use mockall::Sequence;

    use super::*;
    use crate::core::traits::probe::MockProcessProbe;

    const MB: u64 = 1024 * 1024;

    fn stat(cpu_ms: u64, rss_mb: u64) -> Option<ProcessStat> {
        Some(ProcessStat {
            cpu_time: Duration::from_millis(cpu_ms),
            rss_bytes: rss_mb * MB,
        })
    }

    #[test]
    fn test_parse_cpu_ticks() {
        let line = "4242 (my (weird) prog) S 1 4242 4242 0 -1 4194560 120 0 0 0 37 5 0 0 20 0 1 0 1000 10000000 512 18446744073709551615";
        assert_eq!(parse_cpu_ticks(line), Some(42));

        let zombie = "4242 (prog) Z 1 4242 4242 0 -1 4194560 120 0 0 0 37 5 0 0 20 0 1 0";
        assert_eq!(parse_cpu_ticks(zombie), None);
        assert_eq!(parse_cpu_ticks("garbage"), None);
    }

    #[test]
    fn test_parse_resident_pages() {
        assert_eq!(parse_resident_pages("2048 512 300 10 0 400 0\n"), Some(512));
        assert_eq!(parse_resident_pages("2048"), None);
    }

    #[test]
    fn test_sample_between() {
        let sample = sample_between(
            &stat(100, 10).unwrap(),
            &stat(150, 20).unwrap(),
            Duration::from_millis(100),
        );
        assert_eq!(sample, ResourceSample::new(50.0, 20.0));

        let idle = sample_between(&stat(100, 10).unwrap(), &stat(100, 10).unwrap(), Duration::ZERO);
        assert_eq!(idle.cpu_percent, 0.0);
    }

    #[test]
    fn test_procfs_probe_reads_self() {
        let probe = ProcfsProbe::new();
        let stat = probe.read(std::process::id()).expect("own process is observable");
        assert!(stat.rss_bytes > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sampler_collects_until_process_exits() {
        let mut probe = MockProcessProbe::new();
        let mut seq = Sequence::new();
        probe
            .expect_read()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(stat(0, 10));
        probe
            .expect_read()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(stat(50, 20));
        probe
            .expect_read()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(stat(150, 40));
        probe
            .expect_read()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(None);

        let handle = SamplerHandle::spawn(7, Arc::new(probe), Duration::from_millis(100));
        tokio::time::sleep(Duration::from_millis(500)).await;
        let samples = handle.finish().await.unwrap();

        assert_eq!(
            samples,
            vec![ResourceSample::new(50.0, 20.0), ResourceSample::new(100.0, 40.0)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sampler_yields_nothing_for_exited_process() {
        let mut probe = MockProcessProbe::new();
        probe.expect_read().times(1).return_const(None);

        let handle = SamplerHandle::spawn(7, Arc::new(probe), Duration::from_millis(100));
        let samples = handle.finish().await.unwrap();

        assert!(samples.is_empty());
    }
}
