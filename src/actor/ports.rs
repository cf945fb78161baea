//! Collaborators a match task talks to but does not own.
//!
//! Session presence, chat and lobby bookkeeping live outside the match. The
//! match only looks sessions up and notifies the other collaborators.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{info, warn};

use super::ServerEvent;
use crate::model::{MatchId, PlayerId, TeamRole};

/// A single player's outbound channel.
pub trait EventSink: Send + Sync {
    /// Deliver `event`. Returns `false` when the session is gone.
    fn send(&self, event: ServerEvent) -> bool;
}

/// Read-only lookup of the sessions connected to a match.
pub trait SessionRegistry: Send + Sync {
    fn session_for(&self, player: PlayerId) -> Option<Arc<dyn EventSink>>;

    fn broadcast_all(&self, event: &ServerEvent);

    fn broadcast_team(&self, role: TeamRole, event: &ServerEvent);
}

pub trait ChatRelay: Send + Sync {
    fn sync_round_participants(&self, smuggler: PlayerId, inspector: PlayerId);
    fn clear_round_chat(&self);
    fn clear_all_game_chat(&self);
}

pub trait LifecycleNotifier: Send + Sync {
    fn publish_game_ended(&self, match_id: MatchId);
}

/// Parent that spawned the match, e.g. a lobby.
pub trait Supervisor: Send + Sync {
    fn notify_game_ended(&self);
}

/// The full set of collaborators handed to a match task.
#[derive(Clone)]
pub struct MatchPorts {
    pub sessions: Arc<dyn SessionRegistry>,
    pub chat: Arc<dyn ChatRelay>,
    pub lifecycle: Arc<dyn LifecycleNotifier>,
    pub supervisor: Arc<dyn Supervisor>,
}

impl MatchPorts {
    /// Use `sessions` for delivery and log every other notification.
    pub fn with_sessions(sessions: Arc<dyn SessionRegistry>) -> Self {
        let logging = Arc::new(TracingPorts);
        Self {
            sessions,
            chat: logging.clone(),
            lifecycle: logging.clone(),
            supervisor: logging,
        }
    }
}

/// Channel-backed session of one in-process player.
#[derive(Debug)]
pub struct ChannelSink {
    player: PlayerId,
    sender: UnboundedSender<ServerEvent>,
}

impl EventSink for ChannelSink {
    fn send(&self, event: ServerEvent) -> bool {
        match self.sender.send(event) {
            Ok(()) => true,
            Err(e) => {
                warn!(player = self.player, event = %e.0.to_json(), "session closed, event dropped");
                false
            }
        }
    }
}

#[derive(Debug)]
struct LocalSession {
    role: TeamRole,
    sink: Arc<ChannelSink>,
}

/// In-process [`SessionRegistry`] where every session is an unbounded channel.
#[derive(Debug, Default)]
pub struct LocalSessionRegistry {
    sessions: RwLock<BTreeMap<PlayerId, LocalSession>>,
}

impl LocalSessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or replace) the session of `player` and return its event stream.
    pub fn connect(&self, player: PlayerId, role: TeamRole) -> UnboundedReceiver<ServerEvent> {
        let (sender, receiver) = unbounded_channel();
        let session = LocalSession {
            role,
            sink: Arc::new(ChannelSink { player, sender }),
        };
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(player, session);
        receiver
    }

    pub fn disconnect(&self, player: PlayerId) -> bool {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&player)
            .is_some()
    }

    fn deliver(&self, event: &ServerEvent, filter: impl Fn(TeamRole) -> bool) {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        for session in sessions.values().filter(|session| filter(session.role)) {
            session.sink.send(event.clone());
        }
    }
}

impl SessionRegistry for LocalSessionRegistry {
    fn session_for(&self, player: PlayerId) -> Option<Arc<dyn EventSink>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&player)
            .map(|session| session.sink.clone() as Arc<dyn EventSink>)
    }

    fn broadcast_all(&self, event: &ServerEvent) {
        self.deliver(event, |_| true);
    }

    fn broadcast_team(&self, role: TeamRole, event: &ServerEvent) {
        self.deliver(event, |session_role| session_role == role);
    }
}

/// Chat, lifecycle and supervisor stand-in that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPorts;

impl ChatRelay for TracingPorts {
    fn sync_round_participants(&self, smuggler: PlayerId, inspector: PlayerId) {
        info!(smuggler, inspector, "round chat synced");
    }

    fn clear_round_chat(&self) {
        info!("round chat cleared");
    }

    fn clear_all_game_chat(&self) {
        info!("game chat cleared");
    }
}

impl LifecycleNotifier for TracingPorts {
    fn publish_game_ended(&self, match_id: MatchId) {
        info!(match_id, "game ended");
    }
}

impl Supervisor for TracingPorts {
    fn notify_game_ended(&self) {
        info!("supervisor notified");
    }
}
