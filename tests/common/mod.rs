#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for Ocean Saver client integration tests.
//!
//! Provides a channel-fed [`MockOpener`] whose streams are driven from the
//! test body, an in-memory [`MockRoomService`], and helpers for building
//! rooms and wire frames.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use ocean_saver_client::protocol::{CreateRoomRequest, Room, RoomId, Team, TeamLabel};
use ocean_saver_client::{
    ChunkSource, OceanSaverError, OpenError, RoomService, StreamEndpoint, StreamOpener,
};
use tokio::sync::mpsc;

type Chunk = Result<Vec<u8>, OceanSaverError>;
type DropHook = Arc<StdMutex<Option<Box<dyn Fn() + Send + Sync>>>>;

// ── MockOpener ──────────────────────────────────────────────────────

/// Test-side end of one mock stream.
pub struct StreamFeed {
    tx: mpsc::UnboundedSender<Chunk>,
    /// Set once the client dropped the source (stream closed on its side).
    pub dropped: Arc<AtomicBool>,
}

impl StreamFeed {
    /// Push raw bytes as one chunk.
    pub fn send_raw(&self, bytes: &[u8]) {
        let _ = self.tx.send(Ok(bytes.to_vec()));
    }

    /// Push one complete `data:` frame carrying `json`.
    pub fn send_json(&self, json: &serde_json::Value) {
        self.send_raw(data_frame(json).as_bytes());
    }

    /// Fail the stream with a transport error.
    pub fn fail(&self, reason: &str) {
        let _ = self.tx.send(Err(OceanSaverError::Transport(reason.into())));
    }

    /// End the stream normally.
    pub fn end(self) {
        drop(self.tx);
    }

    /// Returns `true` once the client has dropped the source.
    pub fn is_dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }
}

struct ChannelSource {
    rx: mpsc::UnboundedReceiver<Chunk>,
    dropped: Arc<AtomicBool>,
    on_drop: DropHook,
}

#[async_trait]
impl ChunkSource for ChannelSource {
    async fn next_chunk(&mut self) -> Option<Chunk> {
        self.rx.recv().await
    }
}

impl Drop for ChannelSource {
    fn drop(&mut self) {
        if let Some(hook) = self.on_drop.lock().unwrap().as_ref() {
            hook();
        }
        self.dropped.store(true, Ordering::SeqCst);
    }
}

enum Prepared {
    Source(ChannelSource),
    Reject(u16),
}

/// A [`StreamOpener`] whose streams are fed from the test.
///
/// Streams are handed out in the order they were prepared with
/// [`feed`](Self::feed) or [`reject_next`](Self::reject_next). Once the queue
/// is empty, opened streams stay silent until cancelled.
pub struct MockOpener {
    prepared: StdMutex<VecDeque<Prepared>>,
    silent: StdMutex<Vec<StreamFeed>>,
    /// Paths of every endpoint opened, in order.
    pub opened: Arc<StdMutex<Vec<String>>>,
    on_drop: DropHook,
}

impl MockOpener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            prepared: StdMutex::new(VecDeque::new()),
            silent: StdMutex::new(Vec::new()),
            opened: Arc::new(StdMutex::new(Vec::new())),
            on_drop: Arc::new(StdMutex::new(None)),
        })
    }

    /// Prepare the next stream and return its feeding end.
    pub fn feed(&self) -> StreamFeed {
        let (source, feed) = self.channel();
        self.prepared
            .lock()
            .unwrap()
            .push_back(Prepared::Source(source));
        feed
    }

    /// Make the next open fail with `status`.
    pub fn reject_next(&self, status: u16) {
        self.prepared
            .lock()
            .unwrap()
            .push_back(Prepared::Reject(status));
    }

    /// Run `hook` whenever a source is dropped, before it is marked dropped.
    pub fn on_source_drop(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.on_drop.lock().unwrap() = Some(Box::new(hook));
    }

    /// Number of streams opened so far.
    pub fn open_count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }

    fn channel(&self) -> (ChannelSource, StreamFeed) {
        let (tx, rx) = mpsc::unbounded_channel();
        let dropped = Arc::new(AtomicBool::new(false));
        let source = ChannelSource {
            rx,
            dropped: Arc::clone(&dropped),
            on_drop: Arc::clone(&self.on_drop),
        };
        (source, StreamFeed { tx, dropped })
    }
}

#[async_trait]
impl StreamOpener for MockOpener {
    async fn open(&self, endpoint: &StreamEndpoint) -> Result<Box<dyn ChunkSource>, OpenError> {
        self.opened.lock().unwrap().push(endpoint.path().to_string());
        let next = self.prepared.lock().unwrap().pop_front();
        match next {
            Some(Prepared::Source(source)) => Ok(Box::new(source)),
            Some(Prepared::Reject(status)) => Err(OpenError::Rejected { status }),
            None => {
                let (source, feed) = self.channel();
                self.silent.lock().unwrap().push(feed);
                Ok(Box::new(source))
            }
        }
    }
}

// ── MockRoomService ─────────────────────────────────────────────────

/// In-memory [`RoomService`] holding a single room.
pub struct MockRoomService {
    room: StdMutex<Room>,
    /// Number of `start_game` requests received.
    pub start_calls: AtomicUsize,
    /// Number of `get_room` requests received.
    pub get_calls: AtomicUsize,
    start_status: StdMutex<Option<u16>>,
    failing_gets: AtomicUsize,
}

impl MockRoomService {
    pub fn new(room: Room) -> Arc<Self> {
        Arc::new(Self {
            room: StdMutex::new(room),
            start_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
            start_status: StdMutex::new(None),
            failing_gets: AtomicUsize::new(0),
        })
    }

    /// Replace the stored room (visible on the next fetch).
    pub fn set_room(&self, room: Room) {
        *self.room.lock().unwrap() = room;
    }

    /// Make `start_game` fail with `status`.
    pub fn reject_start(&self, status: u16) {
        *self.start_status.lock().unwrap() = Some(status);
    }

    /// Make the next `count` fetches fail with a 503.
    pub fn fail_next_gets(&self, count: usize) {
        self.failing_gets.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl RoomService for MockRoomService {
    async fn list_rooms(&self) -> Result<Vec<Room>, OceanSaverError> {
        Ok(vec![self.room.lock().unwrap().clone()])
    }

    async fn create_room(&self, request: &CreateRoomRequest) -> Result<Room, OceanSaverError> {
        let mut room = self.room.lock().unwrap();
        room.title = request.title.clone();
        room.is_private = request.is_private;
        Ok(room.clone())
    }

    async fn get_room(&self, room_id: RoomId) -> Result<Room, OceanSaverError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self.failing_gets.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_gets.store(failing - 1, Ordering::SeqCst);
            return Err(OceanSaverError::http(503, "get room"));
        }
        let room = self.room.lock().unwrap().clone();
        if room.room_id != room_id {
            return Err(OceanSaverError::http(404, "get room"));
        }
        Ok(room)
    }

    async fn join_room(&self, _room_id: RoomId, _password: Option<&str>) -> Result<(), OceanSaverError> {
        Ok(())
    }

    async fn start_game(&self, _room_id: RoomId) -> Result<(), OceanSaverError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        match *self.start_status.lock().unwrap() {
            Some(status) => Err(OceanSaverError::http(status, "start game")),
            None => Ok(()),
        }
    }
}

// ── Builders ────────────────────────────────────────────────────────

/// A public 2-vs-2 room hosted by `host`.
pub fn room(room_id: RoomId, host: &str, team_a: &[&str], team_b: &[&str]) -> Room {
    let team = |label, users: &[&str]| Team {
        id: None,
        team_name: label,
        max_members: 2,
        users: users.iter().map(|u| (*u).to_string()).collect(),
    };
    Room {
        room_id,
        title: format!("room {room_id}"),
        is_private: false,
        host_name: host.to_string(),
        teams: vec![team(TeamLabel::A, team_a), team(TeamLabel::B, team_b)],
    }
}

/// One `data:` frame carrying `json`, including the blank-line terminator.
pub fn data_frame(json: &serde_json::Value) -> String {
    format!("data: {json}\n\n")
}

/// A score message in the stream's wire shape.
pub fn scores_json(entries: &[(&str, i64)]) -> serde_json::Value {
    let teams: Vec<serde_json::Value> = entries
        .iter()
        .map(|(name, score)| serde_json::json!({ "name": name, "score": score }))
        .collect();
    serde_json::json!({ "teams": teams })
}
