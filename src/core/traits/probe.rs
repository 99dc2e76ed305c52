use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProcessStat {
    pub cpu_time: Duration,
    pub rss_bytes: u64,
}

#[mockall::automock]
pub trait ProcessProbe: std::fmt::Debug + Send + Sync {
    /// `None` once the process has exited or cannot be observed.
    fn read(&self, pid: u32) -> Option<ProcessStat>;
}
