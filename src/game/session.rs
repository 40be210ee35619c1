//! Room task: the single writer of a room's state

use std::collections::HashMap;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::GameError;
use super::player::Pose;
use super::room::{Effects, Recipient, RoomState, RoomSummary, Scheduled, TimerEvent};
use crate::util::time::GameClock;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Queued commands per room
const COMMAND_BUFFER: usize = 256;

/// Work for a room task
#[derive(Debug)]
pub enum RoomCommand {
    Join {
        player_id: Uuid,
        name: String,
        outbound: mpsc::Sender<ServerMsg>,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    Input {
        player_id: Uuid,
        msg: ClientMsg,
    },
    Leave {
        player_id: Uuid,
    },
    Timer {
        epoch: u64,
        event: TimerEvent,
    },
}

/// Why a join through a handle did not go through
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinError {
    Rejected(GameError),
    /// The room task already stopped
    Closed,
}

/// Handle to a running room
#[derive(Clone, Debug)]
pub struct RoomHandle {
    pub id: Uuid,
    pub code: String,
    tx: mpsc::Sender<RoomCommand>,
    summary: watch::Receiver<RoomSummary>,
}

impl RoomHandle {
    /// Queue a command. Returns false once the room has stopped.
    pub async fn send(&self, cmd: RoomCommand) -> bool {
        self.tx.send(cmd).await.is_ok()
    }

    pub async fn join(
        &self,
        player_id: Uuid,
        name: String,
        outbound: mpsc::Sender<ServerMsg>,
    ) -> Result<(), JoinError> {
        let (reply, rx) = oneshot::channel();
        let cmd = RoomCommand::Join {
            player_id,
            name,
            outbound,
            reply,
        };
        if !self.send(cmd).await {
            return Err(JoinError::Closed);
        }
        match rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(JoinError::Rejected(e)),
            Err(_) => Err(JoinError::Closed),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub fn summary(&self) -> RoomSummary {
        self.summary.borrow().clone()
    }

    pub fn player_count(&self) -> usize {
        self.summary.borrow().players
    }
}

/// The room task
pub struct GameRoom {
    state: RoomState,
    commands: mpsc::Receiver<RoomCommand>,
    /// Timers hold this so they never keep a stopped room reachable
    timer_tx: mpsc::WeakSender<RoomCommand>,
    connections: HashMap<Uuid, mpsc::Sender<ServerMsg>>,
    summary_tx: watch::Sender<RoomSummary>,
    clock: GameClock,
}

impl GameRoom {
    pub fn new(state: RoomState) -> (Self, RoomHandle) {
        let (tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (summary_tx, summary) = watch::channel(state.summary());

        let handle = RoomHandle {
            id: Uuid::new_v4(),
            code: state.code().to_string(),
            tx: tx.clone(),
            summary,
        };

        let room = Self {
            state,
            commands,
            timer_tx: tx.downgrade(),
            connections: HashMap::new(),
            summary_tx,
            clock: GameClock::start(),
        };

        (room, handle)
    }

    /// Process commands until the last player leaves
    pub async fn run(mut self) {
        info!(room = %self.state.code(), "Room opened");

        while let Some(cmd) = self.commands.recv().await {
            self.handle(cmd);
            self.summary_tx.send_replace(self.state.summary());

            if self.state.is_empty() {
                info!(room = %self.state.code(), "All players left, closing room");
                break;
            }
        }
    }

    fn handle(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join {
                player_id,
                name,
                outbound,
                reply,
            } => match self.state.join(player_id, &name) {
                Ok(effects) => {
                    self.connections.insert(player_id, outbound);
                    let _ = reply.send(Ok(()));
                    self.dispatch(effects);
                }
                Err(e) => {
                    debug!(room = %self.state.code(), player_id = %player_id, error = %e, "Join rejected");
                    let _ = reply.send(Err(e));
                }
            },
            RoomCommand::Input { player_id, msg } => self.handle_input(player_id, msg),
            RoomCommand::Leave { player_id } => self.handle_leave(player_id),
            RoomCommand::Timer { epoch, event } => {
                let effects = self.state.on_timer(epoch, event);
                self.dispatch(effects);
            }
        }
    }

    fn handle_leave(&mut self, player_id: Uuid) {
        let effects = self.state.leave(player_id);
        self.connections.remove(&player_id);
        self.dispatch(effects);
    }

    fn handle_input(&mut self, player_id: Uuid, msg: ClientMsg) {
        if !self.connections.contains_key(&player_id) {
            debug!(room = %self.state.code(), player_id = %player_id, "Input from non-member dropped");
            return;
        }

        let now = self.clock.now_ms();
        // lobby actions are answered with an error, gameplay rejections are dropped
        let (result, reply_on_error) = match msg {
            ClientMsg::StartGame => (self.state.start_game(player_id, now), true),
            ClientMsg::JoinGame { .. } => (Err(GameError::State("Already in a room.")), true),
            ClientMsg::PlayerMovement { x, y, z, rotation } => {
                let pose = Pose { x, y, z, rotation };
                (self.state.handle_movement(player_id, pose), false)
            }
            ClientMsg::Shoot {
                target_id,
                weapon_type,
            } => (
                self.state.handle_shot(player_id, target_id, weapon_type, now),
                false,
            ),
            ClientMsg::PlayerShoot {
                origin,
                direction,
                weapon_type,
            } => (
                self.state.handle_tracer(player_id, origin, direction, weapon_type),
                false,
            ),
            ClientMsg::DamageObstacle { id, damage } => (
                self.state.handle_obstacle_damage(player_id, &id, damage),
                false,
            ),
            ClientMsg::PickupWeapon { pickup_id } => {
                (self.state.handle_pickup(player_id, &pickup_id), false)
            }
            ClientMsg::WeaponSwitch { weapon_type } => {
                (self.state.handle_weapon_switch(player_id, weapon_type), false)
            }
            ClientMsg::LeaveGame => {
                self.handle_leave(player_id);
                return;
            }
            ClientMsg::Ping { t } => {
                self.deliver(
                    Recipient::Player(player_id),
                    ServerMsg::Pong { t, server_time: now },
                );
                return;
            }
        };

        match result {
            Ok(effects) => self.dispatch(effects),
            Err(e) if reply_on_error => {
                debug!(room = %self.state.code(), player_id = %player_id, error = %e, "Request rejected");
                self.deliver(
                    Recipient::Player(player_id),
                    ServerMsg::GameError {
                        code: e.code().to_string(),
                        message: e.to_string(),
                    },
                );
            }
            Err(e) => {
                debug!(room = %self.state.code(), player_id = %player_id, error = %e, "Event dropped");
            }
        }
    }

    fn dispatch(&self, effects: Effects) {
        for outbound in effects.messages {
            self.deliver(outbound.to, outbound.msg);
        }
        for timer in effects.timers {
            self.arm(timer);
        }
    }

    fn deliver(&self, to: Recipient, msg: ServerMsg) {
        match to {
            Recipient::Player(id) => {
                if let Some(conn) = self.connections.get(&id) {
                    self.push(id, conn, msg);
                }
            }
            Recipient::Room => {
                for (id, conn) in &self.connections {
                    self.push(*id, conn, msg.clone());
                }
            }
            Recipient::RoomExcept(except) => {
                for (id, conn) in self.connections.iter().filter(|(id, _)| **id != except) {
                    self.push(*id, conn, msg.clone());
                }
            }
        }
    }

    /// Never waits on a slow client; a full queue drops the message
    fn push(&self, id: Uuid, conn: &mpsc::Sender<ServerMsg>, msg: ServerMsg) {
        match conn.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(room = %self.state.code(), player_id = %id, "Outbound queue full, message dropped");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(room = %self.state.code(), player_id = %id, "Connection already closed");
            }
        }
    }

    fn arm(&self, timer: Scheduled) {
        let weak = self.timer_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timer.delay).await;
            if let Some(tx) = weak.upgrade() {
                let _ = tx
                    .send(RoomCommand::Timer {
                        epoch: timer.epoch,
                        event: timer.event,
                    })
                    .await;
            }
        });
    }
}
