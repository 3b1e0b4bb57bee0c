//! Module `port_pool`
//!
//! Process-wide allocator for data-connection port numbers, shared by all
//! sessions. A single worker task owns the available/reserved sets and
//! serves requests one at a time over a channel, so every reservation and
//! release is atomic with respect to all other callers: two concurrent
//! reservations can never be granted the same port.
//!
//! Which free port a reservation gets is arbitrary and not part of the
//! contract; callers must not depend on any particular order.

use std::collections::HashSet;

use log::warn;
use tokio::sync::{mpsc, oneshot};

use crate::error::StartupError;

const REQUEST_QUEUE_DEPTH: usize = 32;

enum PoolRequest {
    Reserve { reply: oneshot::Sender<Option<u16>> },
    Release { port: u16 },
}

/// Cloneable handle to a port pool worker. One pool instance serves the
/// passive range; active mode either shares it or gets a dedicated
/// single-port instance, depending on configuration.
#[derive(Clone)]
pub struct PortPool {
    requests: mpsc::Sender<PoolRequest>,
}

impl PortPool {
    /// Seeds the inclusive range `[begin, end]` and spawns the worker task.
    /// A range with `begin > end` is a fatal startup error.
    pub fn spawn(begin: u16, end: u16) -> Result<Self, StartupError> {
        let worker = PoolWorker::new(begin, end)?;
        let (tx, rx) = mpsc::channel(REQUEST_QUEUE_DEPTH);
        tokio::spawn(worker.run(rx));
        Ok(Self { requests: tx })
    }

    /// Reserves one currently-available port, or returns `None` when the
    /// pool is exhausted. Never blocks waiting for a port to free up.
    pub async fn reserve(&self) -> Option<u16> {
        let (reply, response) = oneshot::channel();
        if self
            .requests
            .send(PoolRequest::Reserve { reply })
            .await
            .is_err()
        {
            return None;
        }
        response.await.unwrap_or(None)
    }

    /// Returns a previously reserved port to the pool. Out-of-range or
    /// never-reserved ports are logged by the worker and ignored.
    pub async fn release(&self, port: u16) {
        let _ = self.requests.send(PoolRequest::Release { port }).await;
    }
}

/// Owns the pool state. Invariant: `available` and `reserved` are disjoint
/// and their union is always the full configured range.
struct PoolWorker {
    begin: u16,
    end: u16,
    available: HashSet<u16>,
    reserved: HashSet<u16>,
}

impl PoolWorker {
    fn new(begin: u16, end: u16) -> Result<Self, StartupError> {
        if begin > end {
            return Err(StartupError::PortRange { begin, end });
        }
        Ok(Self {
            begin,
            end,
            available: (begin..=end).collect(),
            reserved: HashSet::new(),
        })
    }

    async fn run(mut self, mut requests: mpsc::Receiver<PoolRequest>) {
        while let Some(request) = requests.recv().await {
            match request {
                PoolRequest::Reserve { reply } => {
                    let _ = reply.send(self.reserve());
                }
                PoolRequest::Release { port } => self.release(port),
            }
        }
    }

    fn reserve(&mut self) -> Option<u16> {
        let port = self.available.iter().next().copied()?;
        self.available.remove(&port);
        self.reserved.insert(port);
        Some(port)
    }

    fn release(&mut self, port: u16) {
        if port < self.begin || port > self.end {
            warn!("Release request for port out of range: {}", port);
            return;
        }
        if !self.reserved.remove(&port) {
            warn!("Release request for port that is not reserved: {}", port);
            return;
        }
        self.available.insert(port);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_inverted_range() {
        assert!(PoolWorker::new(5000, 4000).is_err());
    }

    #[test]
    fn test_grants_exactly_range_size_ports() {
        let mut pool = PoolWorker::new(5000, 5004).unwrap();
        let mut granted = HashSet::new();
        for _ in 0..5 {
            let port = pool.reserve().expect("pool exhausted too early");
            assert!((5000..=5004).contains(&port));
            assert!(granted.insert(port), "duplicate grant");
        }
        assert_eq!(pool.reserve(), None);
    }

    #[test]
    fn test_release_makes_exactly_one_grant_available() {
        let mut pool = PoolWorker::new(6000, 6002).unwrap();
        let mut granted = vec![];
        while let Some(port) = pool.reserve() {
            granted.push(port);
        }
        pool.release(granted[1]);
        assert_eq!(pool.reserve(), Some(granted[1]));
        assert_eq!(pool.reserve(), None);
    }

    #[test]
    fn test_bogus_releases_leave_pool_unchanged() {
        let mut pool = PoolWorker::new(7000, 7001).unwrap();
        let first = pool.reserve().unwrap();

        // out of range
        pool.release(80);
        // in range but never reserved
        let free = if first == 7000 { 7001 } else { 7000 };
        pool.release(free);
        // double release
        pool.release(first);
        pool.release(first);

        assert_eq!(pool.available.len() + pool.reserved.len(), 2);
        let second = pool.reserve().unwrap();
        assert_ne!(first, second);
        assert_eq!(pool.reserve(), None);
    }

    #[test]
    fn test_single_port_range() {
        let mut pool = PoolWorker::new(20, 20).unwrap();
        assert_eq!(pool.reserve(), Some(20));
        assert_eq!(pool.reserve(), None);
        pool.release(20);
        assert_eq!(pool.reserve(), Some(20));
    }

    #[tokio::test]
    async fn test_concurrent_reservations_never_collide() {
        let pool = PortPool::spawn(9000, 9009).unwrap();

        let mut tasks = vec![];
        for _ in 0..30 {
            let handle = pool.clone();
            tasks.push(tokio::spawn(async move { handle.reserve().await }));
        }

        let mut granted = HashSet::new();
        let mut refused = 0;
        for task in tasks {
            match task.await.unwrap() {
                Some(port) => assert!(granted.insert(port), "duplicate grant"),
                None => refused += 1,
            }
        }
        assert_eq!(granted.len(), 10);
        assert_eq!(refused, 20);
    }

    #[tokio::test]
    async fn test_release_then_reserve_through_handle() {
        let pool = PortPool::spawn(9100, 9100).unwrap();
        let port = pool.reserve().await.unwrap();
        assert_eq!(pool.reserve().await, None);
        pool.release(port).await;
        assert_eq!(pool.reserve().await, Some(port));
    }
}
