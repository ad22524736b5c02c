use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Traffic counters for one socket, accumulated over all its sessions.
#[derive(Debug)]
pub struct Stats {
    recv_bytes: AtomicU64,
    sent_bytes: AtomicU64,
    created: Instant,
    connections: AtomicU64,
    connected_since: Mutex<Option<Instant>>,
}

impl Default for Stats {
    fn default() -> Self {
        Stats::new()
    }
}

impl Stats {
    pub fn new() -> Self {
        Stats {
            recv_bytes: AtomicU64::new(0),
            sent_bytes: AtomicU64::new(0),
            created: Instant::now(),
            connections: AtomicU64::new(0),
            connected_since: Mutex::new(None),
        }
    }

    pub fn recv_bytes(&self) -> u64 {
        self.recv_bytes.load(Ordering::Relaxed)
    }

    pub fn add_recv_bytes(&self, bytes: u64) {
        self.recv_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn sent_bytes(&self) -> u64 {
        self.sent_bytes.load(Ordering::Relaxed)
    }

    pub fn add_sent_bytes(&self, bytes: u64) {
        self.sent_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Number of sessions that reached the connected state
    pub fn connections(&self) -> u64 {
        self.connections.load(Ordering::Relaxed)
    }

    pub fn age(&self) -> Duration {
        self.created.elapsed()
    }

    /// Time since the current session connected, `None` if not connected
    pub fn connected_for(&self) -> Option<Duration> {
        self.since().map(|since| since.elapsed())
    }

    pub(crate) fn mark_connected(&self) {
        self.connections.fetch_add(1, Ordering::Relaxed);
        *self.connected_since.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
    }

    pub(crate) fn mark_disconnected(&self) {
        *self.connected_since.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn since(&self) -> Option<Instant> {
        *self.connected_since.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = Stats::new();
        stats.add_recv_bytes(10);
        stats.add_recv_bytes(5);
        stats.add_sent_bytes(7);
        assert_eq!(stats.recv_bytes(), 15);
        assert_eq!(stats.sent_bytes(), 7);
    }

    #[test]
    fn test_connected_window() {
        let stats = Stats::new();
        assert_eq!(stats.connections(), 0);
        assert!(stats.connected_for().is_none());

        stats.mark_connected();
        assert_eq!(stats.connections(), 1);
        assert!(stats.connected_for().is_some());

        stats.mark_disconnected();
        assert!(stats.connected_for().is_none());
        assert_eq!(stats.connections(), 1);
    }

    #[test]
    fn test_age_outlives_sessions() {
        let stats = Stats::new();
        std::thread::sleep(Duration::from_millis(20));
        stats.mark_connected();
        stats.mark_disconnected();
        assert!(stats.age() >= Duration::from_millis(20));
    }
}
