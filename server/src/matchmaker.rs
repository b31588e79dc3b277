//! First-come, first-served matchmaking
//!
//! The matchmaker is a single optional slot guarded by one mutex. Enqueue is
//! an atomic test-and-swap: an empty slot stores the caller, an occupied
//! slot yields its occupant and the pair goes on to form a room. Because
//! the critical section is one pointer swap, pairing order is exactly the
//! order enqueues serialize on the lock and no waiter can be starved.

use crate::session::Session;
use log::info;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Result of offering a session to the matchmaker.
pub enum EnqueueOutcome {
    /// The slot was empty; the session now waits in it.
    Waiting,
    /// The session was already the waiter; nothing changed.
    AlreadyWaiting,
    /// The slot held someone else; it is now empty and the caller owns the
    /// pairing.
    Paired(Arc<Session>),
}

pub struct Matchmaker {
    slot: Mutex<Option<Arc<Session>>>,
}

impl Matchmaker {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Atomic test-and-swap on the slot.
    pub async fn enqueue(&self, session: Arc<Session>) -> EnqueueOutcome {
        let mut slot = self.slot.lock().await;
        match slot.take() {
            None => {
                info!("Session {} is waiting for an opponent", session.id);
                *slot = Some(session);
                EnqueueOutcome::Waiting
            }
            Some(waiting) if waiting.id == session.id => {
                *slot = Some(waiting);
                EnqueueOutcome::AlreadyWaiting
            }
            Some(waiting) => {
                info!("Pairing session {} with session {}", waiting.id, session.id);
                EnqueueOutcome::Paired(waiting)
            }
        }
    }

    /// Clears the slot if `session_id` is the waiter. Called when a waiting
    /// session disconnects.
    pub async fn remove(&self, session_id: u64) -> bool {
        let mut slot = self.slot.lock().await;
        if slot.as_ref().map(|waiting| waiting.id) == Some(session_id) {
            *slot = None;
            true
        } else {
            false
        }
    }
}

impl Default for Matchmaker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    // No test here sends mail, so the receiver can be dropped immediately.
    fn test_session(id: u64) -> Arc<Session> {
        let (tx, _rx) = mpsc::channel(32);
        Session::new(
            id,
            "127.0.0.1:4000".parse().unwrap(),
            tx,
            Duration::from_millis(10),
        )
    }

    #[tokio::test]
    async fn test_first_enqueue_waits() {
        let matchmaker = Matchmaker::new();
        match matchmaker.enqueue(test_session(1)).await {
            EnqueueOutcome::Waiting => {}
            _ => panic!("first enqueue should wait"),
        }
    }

    #[tokio::test]
    async fn test_second_enqueue_pairs_in_arrival_order() {
        let matchmaker = Matchmaker::new();
        matchmaker.enqueue(test_session(1)).await;
        match matchmaker.enqueue(test_session(2)).await {
            EnqueueOutcome::Paired(waiting) => assert_eq!(waiting.id, 1),
            _ => panic!("second enqueue should pair"),
        }

        // The slot is empty again.
        match matchmaker.enqueue(test_session(3)).await {
            EnqueueOutcome::Waiting => {}
            _ => panic!("slot should have been cleared by pairing"),
        }
    }

    #[tokio::test]
    async fn test_duplicate_enqueue_is_a_noop() {
        let matchmaker = Matchmaker::new();
        let session = test_session(1);
        matchmaker.enqueue(session.clone()).await;
        match matchmaker.enqueue(session).await {
            EnqueueOutcome::AlreadyWaiting => {}
            _ => panic!("re-enqueueing the waiter must not pair it with itself"),
        }
    }

    #[tokio::test]
    async fn test_remove_waiter() {
        let matchmaker = Matchmaker::new();
        matchmaker.enqueue(test_session(1)).await;
        assert!(matchmaker.remove(1).await);
        assert!(!matchmaker.remove(1).await);

        match matchmaker.enqueue(test_session(2)).await {
            EnqueueOutcome::Waiting => {}
            _ => panic!("removed waiter must not pair"),
        }
    }

    #[tokio::test]
    async fn test_remove_ignores_non_waiter() {
        let matchmaker = Matchmaker::new();
        matchmaker.enqueue(test_session(1)).await;
        assert!(!matchmaker.remove(99).await);
        assert!(matchmaker.remove(1).await);
    }

    /// Two enqueues racing produce exactly one pair.
    #[tokio::test]
    async fn test_concurrent_enqueues_pair_exactly_once() {
        let matchmaker = Arc::new(Matchmaker::new());

        for _ in 0..50 {
            let a = tokio::spawn({
                let matchmaker = matchmaker.clone();
                async move { matchmaker.enqueue(test_session(1)).await }
            });
            let b = tokio::spawn({
                let matchmaker = matchmaker.clone();
                async move { matchmaker.enqueue(test_session(2)).await }
            });

            let outcomes = [a.await.unwrap(), b.await.unwrap()];
            let paired = outcomes
                .iter()
                .filter(|outcome| matches!(outcome, EnqueueOutcome::Paired(_)))
                .count();
            let waiting = outcomes
                .iter()
                .filter(|outcome| matches!(outcome, EnqueueOutcome::Waiting))
                .count();
            assert_eq!(paired, 1);
            assert_eq!(waiting, 1);

            // Reset for the next iteration.
            matchmaker.remove(1).await;
            matchmaker.remove(2).await;
        }
    }
}
