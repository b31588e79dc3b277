//! Shared server state and cross-subsystem operations
//!
//! `Server` is the root every task hangs off: the connection registry, the
//! room registry, the matchmaker, the inventory, and the pack queue sender.
//! Operations that cross subsystem boundaries (pairing into a room, buying
//! a pack, leaving, disconnect cleanup) live here so each subsystem's lock
//! discipline stays local. No method holds two of the matchmaker, shard,
//! room, or registry locks across an await.

use crate::config::Config;
use crate::inventory::Inventory;
use crate::matchmaker::{EnqueueOutcome, Matchmaker};
use crate::pack_workers::{self, PackRequest};
use crate::room::Room;
use crate::session::{self, Session};
use log::{debug, info, warn};
use shared::ServerEvent;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex, Semaphore};

pub struct Server {
    pub config: Config,
    pub inventory: Inventory,
    matchmaker: Matchmaker,
    sessions: Mutex<HashMap<u64, Arc<Session>>>,
    rooms: Mutex<HashMap<String, Arc<Room>>>,
    pack_queue: mpsc::Sender<PackRequest>,
    next_session_id: AtomicU64,
    next_room_id: AtomicU64,
}

impl Server {
    /// Builds the server, mints the inventory, and spawns the pack worker
    /// pool plus the periodic status task. Must run inside a tokio runtime.
    pub fn new(config: Config) -> Arc<Self> {
        let (pack_tx, pack_rx) = mpsc::channel(config.pack_queue_capacity);
        let inventory = Inventory::new(&config);

        let server = Arc::new(Self {
            config,
            inventory,
            matchmaker: Matchmaker::new(),
            sessions: Mutex::new(HashMap::new()),
            rooms: Mutex::new(HashMap::new()),
            pack_queue: pack_tx,
            next_session_id: AtomicU64::new(1),
            next_room_id: AtomicU64::new(1),
        });

        pack_workers::spawn_workers(server.clone(), pack_rx);
        tokio::spawn(status_loop(server.clone()));
        server
    }

    pub fn next_session_id(&self) -> u64 {
        self.next_session_id.fetch_add(1, Ordering::Relaxed)
    }

    pub async fn register(&self, session: Arc<Session>) {
        self.sessions.lock().await.insert(session.id, session);
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    /// Accept loop. The semaphore caps concurrently accepted connections so
    /// overload degrades into queueing at the listener instead of file
    /// descriptor exhaustion.
    pub async fn run(self: Arc<Self>, listener: TcpListener) -> std::io::Result<()> {
        let permits = Arc::new(Semaphore::new(self.config.max_connections));
        loop {
            let permit = match permits.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return Ok(()), // semaphore closed: shutting down
            };
            let (stream, addr) = listener.accept().await?;
            let server = self.clone();
            tokio::spawn(async move {
                session::run(server, stream, addr).await;
                drop(permit);
            });
        }
    }

    /// Offers a session to the matchmaker: either it waits in the slot or
    /// it pairs with the current waiter and a room is created. A waiter
    /// whose connection died in the slot is discarded and the swap retried.
    pub async fn enqueue(self: &Arc<Self>, session: &Arc<Session>) {
        if session.room().await.is_some() {
            session
                .send(ServerEvent::System {
                    text: "Leave your current match before queueing again.".to_string(),
                })
                .await;
            return;
        }

        loop {
            match self.matchmaker.enqueue(session.clone()).await {
                EnqueueOutcome::Waiting => {
                    session
                        .send(ServerEvent::System {
                            text: "Waiting for an opponent...".to_string(),
                        })
                        .await;
                    return;
                }
                EnqueueOutcome::AlreadyWaiting => {
                    session
                        .send(ServerEvent::System {
                            text: "You are already in the queue.".to_string(),
                        })
                        .await;
                    return;
                }
                EnqueueOutcome::Paired(waiting) => {
                    if !waiting.is_open() {
                        debug!("Discarding dead waiter {} from the slot", waiting.id);
                        continue;
                    }
                    self.create_room(waiting, session.clone()).await;
                    return;
                }
            }
        }
    }

    /// Builds a room for a fresh pairing, seats both sessions, and notifies
    /// them. Seat order is arrival order: the waiter takes seat 0.
    async fn create_room(self: &Arc<Self>, first: Arc<Session>, second: Arc<Session>) {
        let room_id = format!("room-{}", self.next_room_id.fetch_add(1, Ordering::Relaxed));

        // Fresh hands for a fresh match; leftovers from an abandoned room
        // must not leak into this one.
        first.hand_clear().await;
        second.hand_clear().await;

        let room = Room::new(room_id.clone(), [first.clone(), second.clone()]);
        self.rooms.lock().await.insert(room_id.clone(), room.clone());
        first.set_room(Some(room.clone())).await;
        second.set_room(Some(room)).await;

        let first_name = first.name().await;
        let second_name = second.name().await;
        info!(
            "Room {} created for '{}' and '{}'",
            room_id, first_name, second_name
        );

        first
            .send(ServerEvent::MatchFound {
                room_id: room_id.clone(),
                opponent_name: second_name,
            })
            .await;
        second
            .send(ServerEvent::MatchFound {
                room_id,
                opponent_name: first_name,
            })
            .await;
    }

    /// Validates a BUY_PACK against the buyer's room, then submits the pack
    /// request without blocking the reader: a full queue rejects the
    /// purchase immediately and rolls it back, leaving no partial effect.
    pub async fn buy_pack(self: &Arc<Self>, session: &Arc<Session>, count: u32) {
        let Some(room) = session.room().await else {
            session
                .send(ServerEvent::System {
                    text: "Join a match before buying a pack.".to_string(),
                })
                .await;
            return;
        };

        if let Err(notice) = room.try_begin_purchase(session).await {
            session.send(ServerEvent::System { text: notice }).await;
            return;
        }

        let count = count.clamp(1, self.config.max_packs_per_request);
        let request = PackRequest {
            session: session.clone(),
            count,
        };
        if let Err(e) = self.pack_queue.try_send(request) {
            room.cancel_purchase(session).await;
            warn!(
                "Pack queue rejected a request from session {}: {}",
                session.id, e
            );
            session
                .send(ServerEvent::Error {
                    text: "The server is busy; try buying again shortly.".to_string(),
                })
                .await;
        }
    }

    /// Voluntary LEAVE_ROOM: the leaver is detached and the opponent is
    /// notified and re-enqueued.
    pub async fn leave_room(self: &Arc<Self>, session: &Arc<Session>) {
        match session.take_room().await {
            Some(room) => {
                session.hand_clear().await;
                session
                    .send(ServerEvent::System {
                        text: "You left the match.".to_string(),
                    })
                    .await;
                self.abandon_room(&room, session).await;
            }
            None => {
                session
                    .send(ServerEvent::System {
                        text: "You are not in a match.".to_string(),
                    })
                    .await;
            }
        }
    }

    /// Terminal cleanup for a session: out of the matchmaker slot, out of
    /// its room (notifying and re-enqueueing the opponent), out of the
    /// registry.
    pub(crate) async fn cleanup_session(self: &Arc<Self>, session: &Arc<Session>) {
        self.matchmaker.remove(session.id).await;
        if let Some(room) = session.take_room().await {
            self.abandon_room(&room, session).await;
        }
        self.sessions.lock().await.remove(&session.id);
    }

    /// Tears a room down on leave or disconnect. Only the first teardown of
    /// a room releases the opponent.
    async fn abandon_room(self: &Arc<Self>, room: &Arc<Room>, leaver: &Arc<Session>) {
        self.rooms.lock().await.remove(&room.id);
        if let Some(opponent) = room.abandon(leaver.id).await {
            opponent.set_room(None).await;
            opponent
                .send(ServerEvent::System {
                    text: "Your opponent left the match. Searching for a new one...".to_string(),
                })
                .await;
            if opponent.is_open() {
                self.enqueue(&opponent).await;
            }
        }
    }
}

/// Periodic one-line health log.
async fn status_loop(server: Arc<Server>) {
    let mut ticker = tokio::time::interval(server.config.status_interval);
    ticker.tick().await; // the first tick fires immediately
    loop {
        ticker.tick().await;
        info!(
            "Server status: {} sessions, {} rooms, {} cards in stock",
            server.session_count().await,
            server.room_count().await,
            server.inventory.remaining_total().await
        );
    }
}
