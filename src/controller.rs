//! Battle-room lifecycle: lobby → countdown → active, and back on forfeit.
//!
//! [`RoomController`] is a thin handle around a background controller loop.
//! The loop owns every piece of mutable state (phase, scoreboard, room
//! snapshot, the lobby poller, the score subscription and the timers) and
//! multiplexes commands, timer ticks, poll results and stream messages with
//! `tokio::select!`. Nothing else mutates that state, so no locks are needed;
//! observers read published [`RoomState`] snapshots or consume
//! [`RoomEvent`]s from the bounded channel returned by [`RoomController::start`].
//!
//! # Phases
//!
//! | From | To | Trigger |
//! |---|---|---|
//! | Lobby | Countdown(n) | host calls [`start_game`](RoomController::start_game) and the server accepts |
//! | Countdown(n) | Countdown(n-1) | one tick |
//! | Countdown(1) | Active | the tick that reaches zero |
//! | Active | Lobby | [`forfeit`](RoomController::forfeit) |
//! | Active | Ended | [`end_battle`](RoomController::end_battle) |
//!
//! The battle timer reaching zero does not change the phase; it only emits
//! [`RoomEvent::BattleTimeElapsed`].
//!
//! # Example
//!
//! ```rust,ignore
//! let api = Arc::new(ApiClient::new(&config, tokens)?);
//! let (mut room, mut events) = RoomController::start(api.clone(), api, 42, "alice", &config);
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         RoomEvent::RoomUpdated(r) if r.is_full() => room.start_game().await?,
//!         RoomEvent::ScoresUpdated(s) => println!("A {} : {} B", s.a, s.b),
//!         _ => {}
//!     }
//! }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, Interval};
use tracing::{debug, info, trace, warn};

use crate::config::ClientConfig;
use crate::error::{OceanSaverError, Result};
use crate::event_stream::{EventStreamClient, SubscriptionEnd, SubscriptionHandle};
use crate::poller::{PollHandle, RoomPoller};
use crate::protocol::{Room, RoomId, ScoreUpdate, TeamLabel};
use crate::service::RoomService;
use crate::transport::{StreamEndpoint, StreamOpener};

// ── Public state types ──────────────────────────────────────────────

/// Where a room session currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Waiting for the host to start; the room is being polled.
    Lobby,
    /// Counting down to the battle.
    Countdown {
        /// Ticks left before the battle starts.
        remaining: u32,
    },
    /// Battle in progress; scores are streamed.
    Active {
        /// Battle time left. Stays at zero once elapsed.
        remaining: Duration,
    },
    /// Battle finished by the application.
    Ended,
}

impl GamePhase {
    /// Short name of the phase, without its payload.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Lobby => "lobby",
            Self::Countdown { .. } => "countdown",
            Self::Active { .. } => "active",
            Self::Ended => "ended",
        }
    }

    /// Returns `true` in [`GamePhase::Lobby`].
    pub fn is_lobby(&self) -> bool {
        matches!(self, Self::Lobby)
    }

    /// Returns `true` in [`GamePhase::Active`].
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lobby => f.write_str("lobby"),
            Self::Countdown { remaining } => write!(f, "countdown({remaining})"),
            Self::Active { remaining } => {
                let secs = remaining.as_secs();
                write!(f, "active({:02}:{:02})", secs / 60, secs % 60)
            }
            Self::Ended => f.write_str("ended"),
        }
    }
}

/// Latest known score per team.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scoreboard {
    /// Team A's score.
    pub a: i64,
    /// Team B's score.
    pub b: i64,
}

impl Scoreboard {
    /// Score of `team`.
    pub fn get(&self, team: TeamLabel) -> i64 {
        match team {
            TeamLabel::A => self.a,
            TeamLabel::B => self.b,
        }
    }

    /// Apply an update. Entries whose label is not exactly `"A"` or `"B"` are
    /// ignored. Returns `true` if any score changed.
    pub fn apply(&mut self, update: &ScoreUpdate) -> bool {
        let before = *self;
        for entry in &update.teams {
            match entry.team() {
                Some(TeamLabel::A) => self.a = entry.score,
                Some(TeamLabel::B) => self.b = entry.score,
                None => trace!(label = ?entry.label(), "ignoring score for unknown team"),
            }
        }
        *self != before
    }
}

/// Snapshot of everything the UI renders.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomState {
    /// Current phase.
    pub phase: GamePhase,
    /// Current scores.
    pub scores: Scoreboard,
    /// Last fetched room, if any.
    pub room: Option<Room>,
}

/// Notifications emitted by the controller loop.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    /// The phase changed (including every countdown and battle-timer tick).
    PhaseChanged(GamePhase),
    /// A fetch returned a room that differs from the previous snapshot.
    RoomUpdated(Room),
    /// The scoreboard changed.
    ScoresUpdated(Scoreboard),
    /// A lobby poll failed; polling continues.
    PollFailed(String),
    /// The score stream ended without being cancelled by the controller.
    StreamEnded(SubscriptionEnd),
    /// The battle timer reached zero. Emitted once per battle.
    BattleTimeElapsed,
}

// ── Commands ────────────────────────────────────────────────────────

enum Command {
    StartGame(oneshot::Sender<Result<()>>),
    Forfeit(oneshot::Sender<Result<()>>),
    EndBattle(oneshot::Sender<Result<()>>),
    Resubscribe(oneshot::Sender<Result<()>>),
    Refresh(oneshot::Sender<Result<Room>>),
}

// ── Controller handle ───────────────────────────────────────────────

/// Handle to a running room controller.
///
/// Dropping the handle aborts the controller loop, which in turn cancels the
/// score subscription and stops polling. Prefer [`shutdown`](Self::shutdown)
/// for an orderly stop.
pub struct RoomController {
    room_id: RoomId,
    cmd_tx: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<RoomState>,
    task: Option<tokio::task::JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    shutdown_timeout: Duration,
}

impl RoomController {
    /// Start the controller loop for `room_id` on behalf of `current_user`.
    ///
    /// The loop starts in [`GamePhase::Lobby`], emits `PhaseChanged(Lobby)`
    /// and begins polling the room right away.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn start(
        service: Arc<dyn RoomService>,
        opener: Arc<dyn StreamOpener>,
        room_id: RoomId,
        current_user: impl Into<String>,
        config: &ClientConfig,
    ) -> (Self, mpsc::Receiver<RoomEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (poll_tx, poll_rx) = mpsc::unbounded_channel();
        let (score_tx, score_rx) = mpsc::unbounded_channel();

        let initial = RoomState {
            phase: GamePhase::Lobby,
            scores: Scoreboard::default(),
            room: None,
        };
        let (state_tx, state_rx) = watch::channel(initial);

        let core = ControllerCore {
            room_id,
            current_user: current_user.into(),
            service,
            stream: EventStreamClient::new(opener),
            timing: Timing::from(config),
            phase: GamePhase::Lobby,
            scores: Scoreboard::default(),
            room: None,
            poller: None,
            poll_tx,
            subscription: None,
            generation: 0,
            score_tx,
            ticker: None,
            elapsed_reported: false,
            event_tx,
            state_tx,
        };

        let task = tokio::spawn(controller_loop(
            core,
            Inbox {
                commands: cmd_rx,
                polls: poll_rx,
                scores: score_rx,
                shutdown: shutdown_rx,
            },
        ));

        let controller = Self {
            room_id,
            cmd_tx,
            state_rx,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout: config.shutdown_timeout,
        };
        (controller, event_rx)
    }

    // ── Commands ────────────────────────────────────────────────────

    /// Ask the server to start the battle and begin the countdown.
    ///
    /// # Errors
    ///
    /// - [`OceanSaverError::InvalidPhase`] outside the lobby
    /// - [`OceanSaverError::RoomNotLoaded`] before the first successful fetch
    /// - [`OceanSaverError::NotHost`] when the current user is not the host;
    ///   no request is sent
    /// - the service error when the server refuses
    ///
    /// On any error the phase stays [`GamePhase::Lobby`].
    pub async fn start_game(&self) -> Result<()> {
        self.request(Command::StartGame).await
    }

    /// Leave the battle and return to the lobby.
    ///
    /// The score subscription is cancelled and fully stopped before the phase
    /// becomes [`GamePhase::Lobby`].
    ///
    /// # Errors
    ///
    /// [`OceanSaverError::InvalidPhase`] unless the battle is active.
    pub async fn forfeit(&self) -> Result<()> {
        self.request(Command::Forfeit).await
    }

    /// Finish the battle ([`GamePhase::Ended`]), closing the score subscription.
    ///
    /// # Errors
    ///
    /// [`OceanSaverError::InvalidPhase`] unless the battle is active.
    pub async fn end_battle(&self) -> Result<()> {
        self.request(Command::EndBattle).await
    }

    /// Reopen the score stream after it ended on its own.
    ///
    /// A no-op while the current subscription is still running.
    ///
    /// # Errors
    ///
    /// [`OceanSaverError::InvalidPhase`] unless the battle is active.
    pub async fn resubscribe(&self) -> Result<()> {
        self.request(Command::Resubscribe).await
    }

    /// Fetch the room once, outside the polling schedule.
    ///
    /// # Errors
    ///
    /// The service error if the fetch fails.
    pub async fn refresh(&self) -> Result<Room> {
        self.request(Command::Refresh).await
    }

    /// Stop the controller, cancelling the subscription and polling.
    pub async fn shutdown(&mut self) {
        debug!(room_id = self.room_id, "room controller shutdown requested");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("controller loop terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("controller loop did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("controller loop aborted: {join_err}");
                    }
                }
            }
        }
    }

    // ── State accessors ─────────────────────────────────────────────

    /// The room this controller manages.
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Latest published state.
    pub fn state(&self) -> RoomState {
        self.state_rx.borrow().clone()
    }

    /// Current phase.
    pub fn phase(&self) -> GamePhase {
        self.state_rx.borrow().phase
    }

    /// Current scores.
    pub fn scores(&self) -> Scoreboard {
        self.state_rx.borrow().scores
    }

    /// A receiver that is notified on every state change.
    pub fn watch_state(&self) -> watch::Receiver<RoomState> {
        self.state_rx.clone()
    }

    /// Returns `true` while the controller loop is running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    // ── Internal helpers ────────────────────────────────────────────

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<Result<T>>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(make(reply_tx))
            .map_err(|_| OceanSaverError::ControllerClosed)?;
        reply_rx.await.map_err(|_| OceanSaverError::ControllerClosed)?
    }
}

impl fmt::Debug for RoomController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoomController")
            .field("room_id", &self.room_id)
            .field("phase", &self.phase())
            .field("running", &self.is_running())
            .finish()
    }
}

impl Drop for RoomController {
    fn drop(&mut self) {
        // Aborting drops the loop's state, whose handles cancel the
        // subscription and stop the poller.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Controller loop ─────────────────────────────────────────────────

/// Timing constants copied out of [`ClientConfig`].
#[derive(Debug, Clone, Copy)]
struct Timing {
    poll_interval: Duration,
    countdown: u32,
    battle: Duration,
    tick: Duration,
}

impl From<&ClientConfig> for Timing {
    fn from(config: &ClientConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            countdown: config.countdown_seconds,
            battle: config.battle_duration,
            tick: config.tick_interval.max(Duration::from_millis(1)),
        }
    }
}

/// Receiving ends the loop selects over.
struct Inbox {
    commands: mpsc::UnboundedReceiver<Command>,
    polls: mpsc::UnboundedReceiver<Result<Room>>,
    scores: mpsc::UnboundedReceiver<(u64, serde_json::Value)>,
    shutdown: oneshot::Receiver<()>,
}

/// All state owned by the controller loop.
struct ControllerCore {
    room_id: RoomId,
    current_user: String,
    service: Arc<dyn RoomService>,
    stream: EventStreamClient,
    timing: Timing,

    phase: GamePhase,
    scores: Scoreboard,
    room: Option<Room>,

    poller: Option<PollHandle>,
    poll_tx: mpsc::UnboundedSender<Result<Room>>,

    subscription: Option<SubscriptionHandle>,
    /// Incremented per subscription so messages from a closed one are ignored.
    generation: u64,
    score_tx: mpsc::UnboundedSender<(u64, serde_json::Value)>,

    /// Countdown or battle timer, depending on the phase.
    ticker: Option<Interval>,
    elapsed_reported: bool,

    event_tx: mpsc::Sender<RoomEvent>,
    state_tx: watch::Sender<RoomState>,
}

async fn controller_loop(mut core: ControllerCore, mut inbox: Inbox) {
    debug!(room_id = core.room_id, "controller loop started");
    core.enter_lobby();

    loop {
        tokio::select! {
            biased;

            _ = &mut inbox.shutdown => {
                debug!(room_id = core.room_id, "shutdown signal received");
                break;
            }

            _ = next_tick(&mut core.ticker) => core.on_tick(),

            Some((generation, payload)) = inbox.scores.recv() => core.on_score(generation, payload),

            cmd = inbox.commands.recv() => match cmd {
                Some(cmd) => core.handle_command(cmd).await,
                // Handle dropped without shutdown.
                None => break,
            },

            Some(result) = inbox.polls.recv() => core.on_poll(result),

            end = subscription_end(&mut core.subscription) => core.on_stream_end(end),
        }
    }

    core.teardown().await;
    debug!(room_id = core.room_id, "controller loop exited");
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn subscription_end(subscription: &mut Option<SubscriptionHandle>) -> SubscriptionEnd {
    match subscription {
        Some(handle) => handle.finished().await,
        None => std::future::pending().await,
    }
}

fn ticker_starting_after(period: Duration) -> Interval {
    tokio::time::interval_at(Instant::now() + period, period)
}

impl ControllerCore {
    // ── Transitions ─────────────────────────────────────────────────

    fn enter_lobby(&mut self) {
        self.ticker = None;
        self.set_phase(GamePhase::Lobby);
        self.poller = Some(RoomPoller::start(
            Arc::clone(&self.service),
            self.room_id,
            self.timing.poll_interval,
            self.poll_tx.clone(),
        ));
    }

    fn enter_countdown(&mut self) {
        if let Some(mut poller) = self.poller.take() {
            poller.stop();
        }
        if self.timing.countdown == 0 {
            self.enter_active();
            return;
        }
        self.ticker = Some(ticker_starting_after(self.timing.tick));
        self.set_phase(GamePhase::Countdown {
            remaining: self.timing.countdown,
        });
    }

    fn enter_active(&mut self) {
        self.ticker = Some(ticker_starting_after(self.timing.tick));
        self.elapsed_reported = false;
        self.scores = Scoreboard::default();
        self.set_phase(GamePhase::Active {
            remaining: self.timing.battle,
        });
        self.open_subscription();
        info!(room_id = self.room_id, "battle started");
    }

    fn open_subscription(&mut self) {
        if let Some(previous) = self.subscription.take() {
            // Dropping cancels; only reached when the old stream already ended.
            drop(previous);
        }
        self.generation += 1;
        let generation = self.generation;
        let score_tx = self.score_tx.clone();
        let handle = self.stream.subscribe(
            StreamEndpoint::game_scores(self.room_id),
            move |payload| {
                // The loop may already be gone during teardown.
                let _ = score_tx.send((generation, payload));
            },
        );
        self.subscription = Some(handle);
    }

    async fn close_subscription(&mut self) {
        if let Some(mut handle) = self.subscription.take() {
            let end = handle.close().await;
            debug!(room_id = self.room_id, %end, "score subscription closed");
        }
    }

    // ── Event handlers ──────────────────────────────────────────────

    fn on_tick(&mut self) {
        match self.phase {
            GamePhase::Countdown { remaining } => {
                let remaining = remaining.saturating_sub(1);
                if remaining == 0 {
                    self.enter_active();
                } else {
                    self.set_phase(GamePhase::Countdown { remaining });
                }
            }
            GamePhase::Active { remaining } => {
                let remaining = remaining.saturating_sub(self.timing.tick);
                self.set_phase(GamePhase::Active { remaining });
                if remaining.is_zero() {
                    self.ticker = None;
                    if !self.elapsed_reported {
                        self.elapsed_reported = true;
                        info!(room_id = self.room_id, "battle time elapsed");
                        self.emit(RoomEvent::BattleTimeElapsed);
                    }
                }
            }
            GamePhase::Lobby | GamePhase::Ended => {
                self.ticker = None;
            }
        }
    }

    fn on_score(&mut self, generation: u64, payload: serde_json::Value) {
        if generation != self.generation || !self.phase.is_active() {
            trace!(room_id = self.room_id, "dropping score message from closed subscription");
            return;
        }
        let Some(update) = ScoreUpdate::from_payload(&payload) else {
            debug!(room_id = self.room_id, "ignoring stream message without teams: {payload}");
            return;
        };
        if self.scores.apply(&update) {
            debug!(room_id = self.room_id, a = self.scores.a, b = self.scores.b, "scores updated");
            self.publish();
            self.emit(RoomEvent::ScoresUpdated(self.scores));
        }
    }

    fn on_poll(&mut self, result: Result<Room>) {
        if !self.phase.is_lobby() {
            trace!(room_id = self.room_id, "dropping poll result outside lobby");
            return;
        }
        match result {
            Ok(room) => self.update_room(room),
            Err(e) => {
                warn!(room_id = self.room_id, "room poll failed: {e}");
                self.emit(RoomEvent::PollFailed(e.to_string()));
            }
        }
    }

    fn on_stream_end(&mut self, end: SubscriptionEnd) {
        self.subscription = None;
        if end == SubscriptionEnd::Cancelled {
            return;
        }
        warn!(room_id = self.room_id, %end, "score stream ended; call resubscribe to reconnect");
        self.emit(RoomEvent::StreamEnded(end));
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::StartGame(reply) => {
                let result = self.start_game().await;
                let _ = reply.send(result);
            }
            Command::Forfeit(reply) => {
                let result = self.forfeit().await;
                let _ = reply.send(result);
            }
            Command::EndBattle(reply) => {
                let result = self.end_battle().await;
                let _ = reply.send(result);
            }
            Command::Resubscribe(reply) => {
                let result = self.resubscribe();
                let _ = reply.send(result);
            }
            Command::Refresh(reply) => {
                let result = self.refresh().await;
                let _ = reply.send(result);
            }
        }
    }

    // ── Commands ────────────────────────────────────────────────────

    async fn start_game(&mut self) -> Result<()> {
        self.require(GamePhase::is_lobby, "lobby")?;
        let room = self.room.as_ref().ok_or(OceanSaverError::RoomNotLoaded)?;
        if !room.is_host(&self.current_user) {
            debug!(room_id = self.room_id, user = %self.current_user, "start refused: not host");
            return Err(OceanSaverError::NotHost);
        }

        if let Err(e) = self.service.start_game(self.room_id).await {
            warn!(room_id = self.room_id, "start game rejected: {e}");
            return Err(e);
        }
        info!(room_id = self.room_id, "game start accepted; counting down");
        self.enter_countdown();
        Ok(())
    }

    async fn forfeit(&mut self) -> Result<()> {
        self.require(GamePhase::is_active, "active")?;
        self.close_subscription().await;
        info!(room_id = self.room_id, "battle forfeited");
        self.enter_lobby();
        Ok(())
    }

    async fn end_battle(&mut self) -> Result<()> {
        self.require(GamePhase::is_active, "active")?;
        self.close_subscription().await;
        self.ticker = None;
        info!(room_id = self.room_id, a = self.scores.a, b = self.scores.b, "battle ended");
        self.set_phase(GamePhase::Ended);
        Ok(())
    }

    fn resubscribe(&mut self) -> Result<()> {
        self.require(GamePhase::is_active, "active")?;
        if self.subscription.as_ref().is_some_and(|s| !s.is_finished()) {
            return Ok(());
        }
        debug!(room_id = self.room_id, "reopening score subscription");
        self.open_subscription();
        Ok(())
    }

    async fn refresh(&mut self) -> Result<Room> {
        let room = self.service.get_room(self.room_id).await?;
        self.update_room(room.clone());
        Ok(room)
    }

    async fn teardown(&mut self) {
        self.ticker = None;
        if let Some(mut poller) = self.poller.take() {
            poller.stop();
        }
        self.close_subscription().await;
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn require(&self, check: fn(&GamePhase) -> bool, expected: &'static str) -> Result<()> {
        if check(&self.phase) {
            Ok(())
        } else {
            Err(OceanSaverError::InvalidPhase {
                expected,
                actual: self.phase.to_string(),
            })
        }
    }

    fn update_room(&mut self, room: Room) {
        if self.room.as_ref() == Some(&room) {
            return;
        }
        if !room.is_consistent() {
            warn!(room_id = self.room_id, "room snapshot violates membership invariants");
        }
        self.room = Some(room.clone());
        self.publish();
        self.emit(RoomEvent::RoomUpdated(room));
    }

    fn set_phase(&mut self, phase: GamePhase) {
        if self.phase.name() != phase.name() {
            debug!(room_id = self.room_id, from = %self.phase, to = %phase, "phase transition");
        }
        self.phase = phase;
        self.publish();
        self.emit(RoomEvent::PhaseChanged(phase));
    }

    fn publish(&self) {
        self.state_tx.send_replace(RoomState {
            phase: self.phase,
            scores: self.scores,
            room: self.room.clone(),
        });
    }

    /// Emit an event. If the channel is full, log a warning and drop the
    /// event to avoid blocking the loop.
    fn emit(&self, event: RoomEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                warn!("room event channel full, dropping event: {dropped:?}");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                trace!("room event channel closed, receiver dropped");
            }
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────

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
    use crate::protocol::TeamScore;

    #[test]
    fn scoreboard_updates_only_matching_team() {
        let mut scores = Scoreboard { a: 1, b: 4 };
        let changed = scores.apply(&ScoreUpdate {
            teams: vec![TeamScore::new("A", 7)],
        });
        assert!(changed);
        assert_eq!(scores, Scoreboard { a: 7, b: 4 });
    }

    #[test]
    fn scoreboard_ignores_unknown_labels() {
        let mut scores = Scoreboard::default();
        let changed = scores.apply(&ScoreUpdate {
            teams: vec![TeamScore::new("C", 3), TeamScore::new("a", 9)],
        });
        assert!(!changed);
        assert_eq!(scores, Scoreboard::default());
    }

    #[test]
    fn scoreboard_same_value_is_not_a_change() {
        let mut scores = Scoreboard { a: 2, b: 0 };
        assert!(!scores.apply(&ScoreUpdate {
            teams: vec![TeamScore::new("A", 2)],
        }));
        assert_eq!(scores.get(TeamLabel::A), 2);
    }

    #[test]
    fn phase_display() {
        assert_eq!(GamePhase::Lobby.to_string(), "lobby");
        assert_eq!(GamePhase::Countdown { remaining: 3 }.to_string(), "countdown(3)");
        assert_eq!(
            GamePhase::Active {
                remaining: Duration::from_secs(1799)
            }
            .to_string(),
            "active(29:59)"
        );
        assert_eq!(GamePhase::Ended.name(), "ended");
    }

    #[test]
    fn timing_clamps_zero_tick() {
        let config = ClientConfig::default().with_tick_interval(Duration::ZERO);
        let timing = Timing::from(&config);
        assert!(timing.tick > Duration::ZERO);
        assert_eq!(timing.countdown, 5);
    }
}
