//! Fixed-interval room polling as an explicit, stoppable task.
//!
//! While a room sits in the lobby, other players join and leave through their
//! own clients. The lobby view stays current by re-fetching the room on a
//! fixed interval. [`RoomPoller::start`] runs that loop on its own task and
//! returns a [`PollHandle`]; stopping or dropping the handle ends polling
//! immediately, including any fetch that is still in flight.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use crate::error::Result;
use crate::protocol::{Room, RoomId};
use crate::service::RoomService;

/// Starts polling tasks.
#[derive(Debug, Clone, Copy)]
pub struct RoomPoller;

impl RoomPoller {
    /// Fetch `room_id` now and then every `interval`, sending each result to `results`.
    ///
    /// Fetch errors are forwarded, not fatal. Polling ends when the handle is
    /// stopped or dropped, or when `results` is closed.
    #[must_use = "dropping the handle stops polling"]
    pub fn start(
        service: Arc<dyn RoomService>,
        room_id: RoomId,
        interval: Duration,
        results: mpsc::UnboundedSender<Result<Room>>,
    ) -> PollHandle {
        debug!(room_id, ?interval, "room polling started");
        let task = tokio::spawn(poll_loop(service, room_id, interval, results));
        PollHandle {
            room_id,
            task: Some(task),
        }
    }
}

/// Owner of a running poll loop.
#[derive(Debug)]
pub struct PollHandle {
    room_id: RoomId,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Stop polling. Idempotent.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!(room_id = self.room_id, "room polling stopped");
        }
    }

    /// Returns `true` while the poll loop is alive.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_loop(
    service: Arc<dyn RoomService>,
    room_id: RoomId,
    interval: Duration,
    results: mpsc::UnboundedSender<Result<Room>>,
) {
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = results.closed() => break,
            _ = ticker.tick() => {}
        }
        trace!(room_id, "polling room");
        let result = service.get_room(room_id).await;
        if results.send(result).is_err() {
            break;
        }
    }
    debug!(room_id, "room poll loop exited");
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::error::OceanSaverError;
    use crate::protocol::CreateRoomRequest;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingService {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RoomService for CountingService {
        async fn list_rooms(&self) -> Result<Vec<Room>> {
            Ok(vec![])
        }
        async fn create_room(&self, _request: &CreateRoomRequest) -> Result<Room> {
            Err(OceanSaverError::http(500, "create room"))
        }
        async fn get_room(&self, room_id: RoomId) -> Result<Room> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n == 1 {
                return Err(OceanSaverError::http(502, "get room"));
            }
            Ok(Room {
                room_id,
                title: format!("poll {n}"),
                is_private: false,
                host_name: "alice".into(),
                teams: vec![],
            })
        }
        async fn join_room(&self, _room_id: RoomId, _password: Option<&str>) -> Result<()> {
            Ok(())
        }
        async fn start_game(&self, _room_id: RoomId) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn polls_immediately_then_on_interval() {
        let service = Arc::new(CountingService {
            calls: AtomicUsize::new(0),
        });
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut handle = RoomPoller::start(service.clone(), 42, Duration::from_secs(3), tx);

        let first = rx.recv().await.unwrap().unwrap();
        assert_eq!(first.title, "poll 0");

        // Errors are forwarded and polling continues.
        assert!(rx.recv().await.unwrap().is_err());
        let third = rx.recv().await.unwrap().unwrap();
        assert_eq!(third.title, "poll 2");

        assert!(handle.is_running());
        handle.stop();
        handle.stop();
        assert!(!handle.is_running());

        let calls = service.calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(service.calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_receiver_ends_loop() {
        let service = Arc::new(CountingService {
            calls: AtomicUsize::new(0),
        });
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = RoomPoller::start(service, 1, Duration::from_secs(3), tx);
        drop(rx);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!handle.is_running());
    }
}
