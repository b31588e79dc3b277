//! Connection lifecycle and command dispatch
//!
//! Each accepted connection becomes a [`Session`] driven by three tasks: a
//! reader that decodes one frame at a time under the read deadline, a writer
//! that drains the session's bounded mailbox in FIFO order under a
//! per-message write deadline, and a keepalive task that enqueues a probe on
//! a fixed interval. The read deadline is the authoritative liveness signal;
//! a silent peer is reaped by it, not by the probe.
//!
//! The session is exclusively owned by its reader task. Every other part of
//! the server reaches it only through the mailbox sender and the lockable
//! room back-reference, which keeps a slow client from stalling anything but
//! its own connection.

use crate::room::Room;
use crate::server::Server;
use log::{debug, info, warn};
use shared::{read_frame, write_frame, Card, ClientCommand, ServerEvent};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::io::{BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;

/// Wall-clock milliseconds stamped into keepalive probes; replies subtract
/// it to estimate round-trip latency.
fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/// One connected client.
pub struct Session {
    /// Process-unique session id.
    pub id: u64,
    /// Peer address; also the display name until LOGIN.
    pub addr: SocketAddr,
    name: Mutex<String>,
    mailbox: mpsc::Sender<ServerEvent>,
    mailbox_send_timeout: Duration,
    hand: Mutex<Vec<Card>>,
    room: Mutex<Option<Arc<Room>>>,
    open: AtomicBool,
    latency_ms: AtomicU64,
}

impl Session {
    pub(crate) fn new(
        id: u64,
        addr: SocketAddr,
        mailbox: mpsc::Sender<ServerEvent>,
        mailbox_send_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            addr,
            name: Mutex::new(addr.to_string()),
            mailbox,
            mailbox_send_timeout,
            hand: Mutex::new(Vec::new()),
            room: Mutex::new(None),
            open: AtomicBool::new(true),
            latency_ms: AtomicU64::new(0),
        })
    }

    pub async fn name(&self) -> String {
        self.name.lock().await.clone()
    }

    pub async fn set_name(&self, name: String) {
        *self.name.lock().await = name;
    }

    /// False once the connection is being torn down. Pack workers check
    /// this before touching the hand of a session that may be gone.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }

    /// Attempts to enqueue an event into the mailbox.
    ///
    /// Drop-newest policy: the send waits at most the configured timeout,
    /// then the message is dropped and the caller learns of it via the
    /// return value. A slow client never stalls a producer for longer.
    pub async fn send(&self, event: ServerEvent) -> bool {
        if !self.is_open() {
            return false;
        }
        match self
            .mailbox
            .send_timeout(event, self.mailbox_send_timeout)
            .await
        {
            Ok(()) => true,
            Err(mpsc::error::SendTimeoutError::Timeout(_)) => {
                warn!("Session {}: mailbox full, dropping message", self.id);
                false
            }
            Err(mpsc::error::SendTimeoutError::Closed(_)) => false,
        }
    }

    pub async fn room(&self) -> Option<Arc<Room>> {
        self.room.lock().await.clone()
    }

    pub async fn set_room(&self, room: Option<Arc<Room>>) {
        *self.room.lock().await = room;
    }

    /// Clears the room back-reference and returns what it pointed to.
    pub async fn take_room(&self) -> Option<Arc<Room>> {
        self.room.lock().await.take()
    }

    pub async fn hand_len(&self) -> usize {
        self.hand.lock().await.len()
    }

    /// Appends a delivered pack to the hand. Called by pack workers, which
    /// hold no room lock; safe because purchases are structurally rejected
    /// while the room is in play.
    pub async fn hand_push(&self, cards: Vec<Card>) {
        self.hand.lock().await.extend(cards);
    }

    /// Removes and returns the identified card, keeping hand order.
    pub async fn hand_take(&self, card_id: &str) -> Option<Card> {
        let mut hand = self.hand.lock().await;
        let index = hand.iter().position(|card| card.id == card_id)?;
        Some(hand.remove(index))
    }

    pub async fn hand_clear(&self) {
        self.hand.lock().await.clear();
    }

    pub fn record_latency(&self, probe_timestamp_ms: u64) {
        let latency = unix_millis().saturating_sub(probe_timestamp_ms);
        self.latency_ms.store(latency, Ordering::Relaxed);
        debug!("Session {}: keepalive latency {} ms", self.id, latency);
    }

    pub fn latency_ms(&self) -> u64 {
        self.latency_ms.load(Ordering::Relaxed)
    }
}

/// Whether the reader keeps going after a command.
enum Flow {
    Continue,
    Quit,
}

/// Drives one connection from accept to teardown.
pub async fn run(server: Arc<Server>, stream: TcpStream, addr: SocketAddr) {
    // Lower reveal latency; a lost frame matters more than a saved byte.
    if let Err(e) = stream.set_nodelay(true) {
        debug!("Failed to set TCP_NODELAY for {}: {}", addr, e);
    }

    let (read_half, write_half) = stream.into_split();
    let (mailbox_tx, mailbox_rx) = mpsc::channel(server.config.mailbox_capacity);
    let session = Session::new(
        server.next_session_id(),
        addr,
        mailbox_tx,
        server.config.mailbox_send_timeout,
    );
    server.register(session.clone()).await;
    info!("Session {} connected from {}", session.id, addr);

    let writer = tokio::spawn(writer_task(
        session.clone(),
        write_half,
        mailbox_rx,
        server.config.write_deadline,
    ));
    let keepalive = tokio::spawn(keepalive_task(
        session.clone(),
        server.config.keepalive_interval,
    ));

    reader_loop(&server, &session, read_half).await;

    // Terminal cleanup: stop the co-tasks, discard the mailbox backlog,
    // then detach from matchmaker, room, and registry.
    session.close();
    keepalive.abort();
    writer.abort();
    server.cleanup_session(&session).await;
    info!("Session {} ({}) disconnected", session.id, session.name().await);
}

/// Drains the mailbox in order, serializing each message to the stream.
/// A message that cannot be written inside the deadline ends the session;
/// head-of-line blocking is bounded by that deadline.
async fn writer_task(
    session: Arc<Session>,
    write_half: OwnedWriteHalf,
    mut mailbox_rx: mpsc::Receiver<ServerEvent>,
    write_deadline: Duration,
) {
    let mut writer = BufWriter::new(write_half);
    while let Some(event) = mailbox_rx.recv().await {
        match timeout(write_deadline, write_frame(&mut writer, &event)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!("Session {}: write failed: {}", session.id, e);
                break;
            }
            Err(_) => {
                warn!("Session {}: write deadline exceeded", session.id);
                break;
            }
        }
    }
    session.close();
}

/// Enqueues a probe on a fixed interval. Failure detection is left to the
/// reader's deadline; this task only keeps traffic flowing.
async fn keepalive_task(session: Arc<Session>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await; // the first tick fires immediately
    loop {
        ticker.tick().await;
        if !session.is_open() {
            break;
        }
        session
            .send(ServerEvent::Keepalive {
                timestamp_ms: unix_millis(),
            })
            .await;
    }
}

/// Decodes one framed command at a time and dispatches it. Malformed frames
/// are dropped without a reply to avoid amplification.
async fn reader_loop(server: &Arc<Server>, session: &Arc<Session>, read_half: OwnedReadHalf) {
    let mut reader = BufReader::new(read_half);
    loop {
        let line = match timeout(server.config.read_deadline, read_frame(&mut reader)).await {
            Ok(Ok(Some(line))) => line,
            Ok(Ok(None)) => {
                debug!("Session {}: peer closed the connection", session.id);
                return;
            }
            Ok(Err(e)) => {
                debug!("Session {}: read failed: {}", session.id, e);
                return;
            }
            Err(_) => {
                info!("Session {}: read deadline exceeded, reaping", session.id);
                return;
            }
        };

        let command: ClientCommand = match serde_json::from_str(&line) {
            Ok(command) => command,
            Err(e) => {
                debug!("Session {}: ignoring malformed frame: {}", session.id, e);
                continue;
            }
        };

        if let Flow::Quit = dispatch(server, session, command).await {
            return;
        }
    }
}

/// Applies one command. The reader never blocks on an internal component
/// for longer than a single command dispatch.
async fn dispatch(server: &Arc<Server>, session: &Arc<Session>, command: ClientCommand) -> Flow {
    match command {
        ClientCommand::Login { name } => {
            let name = name.trim().to_string();
            if name.is_empty() {
                debug!("Session {}: ignoring empty LOGIN name", session.id);
            } else {
                info!("Session {} logged in as '{}'", session.id, name);
                session.set_name(name).await;
            }
        }

        ClientCommand::Enqueue => {
            server.enqueue(session).await;
        }

        ClientCommand::BuyPack { count } => {
            server.buy_pack(session, count).await;
        }

        ClientCommand::PlayCard { card_id } => match session.room().await {
            Some(room) => {
                if let Err(notice) = room.play_card(session, &card_id).await {
                    session.send(ServerEvent::System { text: notice }).await;
                }
            }
            None => {
                session
                    .send(ServerEvent::System {
                        text: "You are not in a match.".to_string(),
                    })
                    .await;
            }
        },

        ClientCommand::SendChat { text } => match session.room().await {
            Some(room) => {
                if let Err(notice) = room.chat(session, text).await {
                    session.send(ServerEvent::System { text: notice }).await;
                }
            }
            None => {
                session
                    .send(ServerEvent::System {
                        text: "You are not in a match.".to_string(),
                    })
                    .await;
            }
        },

        ClientCommand::LeaveRoom => {
            server.leave_room(session).await;
        }

        ClientCommand::KeepaliveReply { timestamp_ms } => {
            session.record_latency(timestamp_ms);
        }

        ClientCommand::Quit => {
            debug!("Session {}: quit requested", session.id);
            return Flow::Quit;
        }
    }
    Flow::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Rarity, Suit};

    fn test_session(id: u64) -> (Arc<Session>, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(2);
        let session = Session::new(
            id,
            "127.0.0.1:4000".parse().unwrap(),
            tx,
            Duration::from_millis(10),
        );
        (session, rx)
    }

    fn test_card(id: &str, power: u32) -> Card {
        Card {
            id: id.to_string(),
            name: format!("{} of Spades", power),
            suit: Suit::Spades,
            power,
            rarity: Rarity::Common,
        }
    }

    #[tokio::test]
    async fn test_name_defaults_to_addr_until_login() {
        let (session, _rx) = test_session(1);
        assert_eq!(session.name().await, "127.0.0.1:4000");
        session.set_name("Alice".to_string()).await;
        assert_eq!(session.name().await, "Alice");
    }

    #[tokio::test]
    async fn test_hand_take_preserves_order() {
        let (session, _rx) = test_session(1);
        session
            .hand_push(vec![test_card("a", 1), test_card("b", 2), test_card("c", 3)])
            .await;

        let taken = session.hand_take("b").await.unwrap();
        assert_eq!(taken.id, "b");
        assert_eq!(session.hand_len().await, 2);
        assert_eq!(session.hand_take("a").await.unwrap().id, "a");
        assert_eq!(session.hand_take("c").await.unwrap().id, "c");
    }

    #[tokio::test]
    async fn test_hand_take_missing_card() {
        let (session, _rx) = test_session(1);
        session.hand_push(vec![test_card("a", 1)]).await;
        assert!(session.hand_take("zzz").await.is_none());
        assert_eq!(session.hand_len().await, 1);
    }

    #[tokio::test]
    async fn test_send_delivers_in_order() {
        let (session, mut rx) = test_session(1);
        assert!(
            session
                .send(ServerEvent::System {
                    text: "first".to_string()
                })
                .await
        );
        assert!(
            session
                .send(ServerEvent::System {
                    text: "second".to_string()
                })
                .await
        );

        match rx.recv().await.unwrap() {
            ServerEvent::System { text } => assert_eq!(text, "first"),
            other => panic!("unexpected event {:?}", other),
        }
        match rx.recv().await.unwrap() {
            ServerEvent::System { text } => assert_eq!(text, "second"),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_drops_when_mailbox_full() {
        let (session, _rx) = test_session(1);
        // Capacity is 2 and nothing drains the receiver.
        assert!(session.send(ServerEvent::Keepalive { timestamp_ms: 1 }).await);
        assert!(session.send(ServerEvent::Keepalive { timestamp_ms: 2 }).await);
        assert!(!session.send(ServerEvent::Keepalive { timestamp_ms: 3 }).await);
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let (session, _rx) = test_session(1);
        session.close();
        assert!(!session.send(ServerEvent::Keepalive { timestamp_ms: 1 }).await);
    }

    #[tokio::test]
    async fn test_record_latency_saturates_on_clock_skew() {
        let (session, _rx) = test_session(1);

        // A probe stamped in the past yields a positive estimate.
        session.record_latency(0);
        assert!(session.latency_ms() > 0);

        // A reply stamped in the future must not underflow.
        session.record_latency(u64::MAX);
        assert_eq!(session.latency_ms(), 0);
    }
}
