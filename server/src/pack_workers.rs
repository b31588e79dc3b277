//! Pack request queue and worker pool
//!
//! BUY_PACK requests land in one bounded queue and are consumed by a fixed
//! pool of workers. The pop is FIFO (a single receiver guarded by a mutex),
//! so no requester is preferred over another; the draws themselves run
//! concurrently across workers, and shard selection is randomized per card
//! so a hot shard cannot monopolize one requester's pack.
//!
//! A worker never takes a room lock while it holds the buyer's hand lock:
//! it appends the pack, releases the hand, and only then calls into the
//! room to settle the purchase. Requests for sessions whose stream has died
//! are discarded unprocessed.

use crate::server::Server;
use crate::session::Session;
use log::{debug, info};
use shared::ServerEvent;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// One queued purchase: `count` packs for `session`.
pub struct PackRequest {
    pub session: Arc<Session>,
    pub count: u32,
}

/// Spawns the fixed worker pool over the shared request queue.
pub fn spawn_workers(server: Arc<Server>, queue_rx: mpsc::Receiver<PackRequest>) {
    let queue_rx = Arc::new(Mutex::new(queue_rx));
    let worker_count = server.config.pack_workers;
    for worker_id in 0..worker_count {
        tokio::spawn(worker_loop(server.clone(), queue_rx.clone(), worker_id));
    }
    info!("Spawned {} pack workers", worker_count);
}

async fn worker_loop(
    server: Arc<Server>,
    queue_rx: Arc<Mutex<mpsc::Receiver<PackRequest>>>,
    worker_id: usize,
) {
    loop {
        // Only the pop is serialized; delivery runs outside the queue lock.
        let request = queue_rx.lock().await.recv().await;
        match request {
            Some(request) => deliver(&server, request).await,
            None => {
                debug!("Pack worker {} shutting down", worker_id);
                return;
            }
        }
    }
}

/// Draws and delivers every pack of one request, then settles the purchase
/// with the buyer's room.
pub(crate) async fn deliver(server: &Arc<Server>, request: PackRequest) {
    let session = request.session;
    if !session.is_open() {
        debug!("Discarding pack request from dead session {}", session.id);
        return;
    }

    for _ in 0..request.count {
        let mut cards = Vec::with_capacity(server.config.pack_size);
        for _ in 0..server.config.pack_size {
            let target = server.inventory.sample_rarity();
            cards.push(server.inventory.draw(target).await);
        }

        // The stream may have died while we drew; never touch the hand of a
        // session that is being torn down.
        if !session.is_open() {
            debug!("Discarding drawn pack for dead session {}", session.id);
            return;
        }
        session.hand_push(cards.clone()).await;

        let stock_remaining = server.inventory.remaining_total().await;
        session
            .send(ServerEvent::PackResult {
                cards,
                stock_remaining,
            })
            .await;
    }

    // The purchase settles only now: mark the buyer ready, which may start
    // the match.
    if let Some(room) = session.room().await {
        room.mark_ready(&session).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::time::Duration;

    fn test_config() -> Config {
        Config {
            initial_cards: 200,
            shard_count: 2,
            pack_workers: 2,
            pack_queue_capacity: 16,
            ..Config::default()
        }
    }

    fn test_session(id: u64) -> (Arc<Session>, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(32);
        let session = Session::new(
            id,
            "127.0.0.1:4000".parse().unwrap(),
            tx,
            Duration::from_millis(10),
        );
        (session, rx)
    }

    #[tokio::test]
    async fn test_delivery_fills_hand_with_exact_pack_size() {
        let server = Server::new(test_config());
        let (session, mut rx) = test_session(1);

        deliver(
            &server,
            PackRequest {
                session: session.clone(),
                count: 1,
            },
        )
        .await;

        assert_eq!(session.hand_len().await, server.config.pack_size);
        match rx.try_recv().unwrap() {
            ServerEvent::PackResult { cards, .. } => {
                assert_eq!(cards.len(), server.config.pack_size);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_multi_pack_request_delivers_one_result_per_pack() {
        let server = Server::new(test_config());
        let (session, mut rx) = test_session(1);

        deliver(
            &server,
            PackRequest {
                session: session.clone(),
                count: 3,
            },
        )
        .await;

        assert_eq!(session.hand_len().await, 3 * server.config.pack_size);
        for _ in 0..3 {
            match rx.try_recv().unwrap() {
                ServerEvent::PackResult { cards, .. } => {
                    assert_eq!(cards.len(), server.config.pack_size);
                }
                other => panic!("unexpected event {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_request_for_closed_session_is_discarded() {
        let server = Server::new(test_config());
        let (session, mut rx) = test_session(1);
        session.close();

        deliver(
            &server,
            PackRequest {
                session: session.clone(),
                count: 1,
            },
        )
        .await;

        assert_eq!(session.hand_len().await, 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stock_remaining_decreases() {
        let server = Server::new(test_config());
        let (session, mut rx) = test_session(1);
        let before = server.inventory.remaining_total().await;

        deliver(
            &server,
            PackRequest {
                session: session.clone(),
                count: 1,
            },
        )
        .await;

        match rx.try_recv().unwrap() {
            ServerEvent::PackResult { stock_remaining, .. } => {
                assert_eq!(stock_remaining, before - server.config.pack_size as u64);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
