//! Room state machine and play resolution
//!
//! A room owns one match between exactly two sessions. All gameplay state
//! lives behind the room's own lock, so its transitions are linearizable:
//!
//! ```text
//! AwaitingPurchase ── both BUY_PACKs settle ──▶ Playing
//! Playing ── a hand empties ──▶ Finished
//! Finished ── a BUY_PACK arrives ──▶ AwaitingPurchase (rematch reset)
//! any ── a player leaves or disconnects ──▶ abandoned
//! ```
//!
//! Reveals are simultaneous: each player places one card per reveal, the
//! placed card stays concealed until both are on the table, then the pair is
//! compared by power with the ♠ > ♥ > ♦ > ♣ suit order breaking power ties.
//! Revealed cards are consumed. Broadcasts go through the per-session
//! mailboxes and inherit their drop-on-timeout policy; the room holds its
//! lock across nothing longer than those bounded enqueue attempts.

use crate::session::Session;
use log::{error, info};
use shared::{Card, GameUpdate, ServerEvent, TIE};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    AwaitingPurchase,
    Playing,
    Finished,
}

struct RoomInner {
    state: RoomState,
    /// At most one card per seat; both present triggers resolution.
    table: [Option<Card>; 2],
    /// Who has submitted a purchase this match (set at request time).
    purchased: [bool; 2],
    /// Who has received their pack this match (set at delivery time).
    ready: [bool; 2],
    reveal_wins: [u32; 2],
    /// Completed reveals this match.
    round: u32,
    abandoned: bool,
}

/// One match between two seated sessions.
pub struct Room {
    pub id: String,
    players: [Arc<Session>; 2],
    inner: Mutex<RoomInner>,
}

impl Room {
    pub fn new(id: String, players: [Arc<Session>; 2]) -> Arc<Self> {
        Arc::new(Self {
            id,
            players,
            inner: Mutex::new(RoomInner {
                state: RoomState::AwaitingPurchase,
                table: [None, None],
                purchased: [false, false],
                ready: [false, false],
                reveal_wins: [0, 0],
                round: 0,
                abandoned: false,
            }),
        })
    }

    fn seat_of(&self, session_id: u64) -> Option<usize> {
        self.players
            .iter()
            .position(|player| player.id == session_id)
    }

    pub async fn state(&self) -> RoomState {
        self.inner.lock().await.state
    }

    /// Registers a purchase attempt. In `Finished` this resets the room for
    /// a rematch and the attempt counts for the new match; a second attempt
    /// in the same match is rejected with a notice.
    pub async fn try_begin_purchase(&self, session: &Arc<Session>) -> Result<(), String> {
        let mut inner = self.inner.lock().await;
        if inner.abandoned {
            return Err("The match is over.".to_string());
        }
        let seat = self
            .seat_of(session.id)
            .ok_or_else(|| "You are not seated in this room.".to_string())?;

        match inner.state {
            RoomState::Playing => {
                Err("You cannot buy a pack while a match is in play.".to_string())
            }
            RoomState::Finished => {
                self.reset_for_rematch(&mut inner).await;
                inner.purchased[seat] = true;
                Ok(())
            }
            RoomState::AwaitingPurchase => {
                if inner.purchased[seat] {
                    Err("You already purchased a pack this match.".to_string())
                } else {
                    inner.purchased[seat] = true;
                    Ok(())
                }
            }
        }
    }

    /// Rolls back a purchase whose pack request could not be queued, so the
    /// rejection leaves no partial effect.
    pub async fn cancel_purchase(&self, session: &Arc<Session>) {
        let mut inner = self.inner.lock().await;
        if let Some(seat) = self.seat_of(session.id) {
            inner.purchased[seat] = false;
            inner.ready[seat] = false;
        }
    }

    /// Called by a pack worker once the purchaser's pack has been
    /// delivered. When both seats are ready the match starts.
    pub async fn mark_ready(&self, session: &Arc<Session>) {
        let mut inner = self.inner.lock().await;
        if inner.abandoned || inner.state != RoomState::AwaitingPurchase {
            return;
        }
        let Some(seat) = self.seat_of(session.id) else {
            return;
        };
        if !inner.purchased[seat] {
            // A delivery that raced a rematch reset; the hand was cleared.
            return;
        }

        inner.ready[seat] = true;
        info!(
            "Room {}: seat {} is ready ({}/2)",
            self.id,
            seat,
            inner.ready.iter().filter(|&&ready| ready).count()
        );

        if inner.ready == [true, true] {
            inner.state = RoomState::Playing;
            inner.table = [None, None];
            inner.reveal_wins = [0, 0];
            inner.round = 0;
            info!("Room {}: match started", self.id);
            let update = self
                .game_update(
                    &inner,
                    "Match started! Play a card.".to_string(),
                    HashMap::new(),
                    String::new(),
                )
                .await;
            self.broadcast(update).await;
        }
    }

    /// Places a card from the player's hand onto the table. Resolves the
    /// reveal once both seats have played.
    pub async fn play_card(&self, session: &Arc<Session>, card_id: &str) -> Result<(), String> {
        let mut inner = self.inner.lock().await;
        if inner.abandoned {
            return Err("The match is over.".to_string());
        }
        let seat = self
            .seat_of(session.id)
            .ok_or_else(|| "You are not seated in this room.".to_string())?;
        if inner.state != RoomState::Playing {
            return Err("The match has not started yet.".to_string());
        }
        if inner.table[seat].is_some() {
            return Err("You already played this reveal.".to_string());
        }

        let card = session
            .hand_take(card_id)
            .await
            .ok_or_else(|| "That card is not in your hand.".to_string())?;
        info!(
            "Room {}: seat {} played {} ({})",
            self.id, seat, card, card.id
        );
        inner.table[seat] = Some(card);

        if inner.table.iter().all(|slot| slot.is_some()) {
            self.resolve_reveal(&mut inner).await;
        } else {
            // The placed card stays concealed until the opponent commits.
            let update = self
                .game_update(
                    &inner,
                    "Card placed. Waiting for the opponent to play...".to_string(),
                    HashMap::new(),
                    String::new(),
                )
                .await;
            self.broadcast(update).await;
        }
        Ok(())
    }

    /// Compares the two table cards, consumes them, scores the reveal, and
    /// finishes the match if a hand has emptied.
    async fn resolve_reveal(&self, inner: &mut RoomInner) {
        let (card0, card1) = match (inner.table[0].take(), inner.table[1].take()) {
            (Some(card0), Some(card1)) => (card0, card1),
            // Unreachable from play_card; leave the table as it was.
            _ => return,
        };

        let names = [self.players[0].name().await, self.players[1].name().await];
        let winner = match card0.duel(&card1) {
            Ordering::Greater => Some(0),
            Ordering::Less => Some(1),
            Ordering::Equal => None,
        };

        inner.round += 1;
        let (reveal_winner, turn_message) = match winner {
            Some(seat) => {
                inner.reveal_wins[seat] += 1;
                let (winning, losing) = if seat == 0 {
                    (&card0, &card1)
                } else {
                    (&card1, &card0)
                };
                (
                    names[seat].clone(),
                    format!(
                        "{} wins the reveal: {} beats {}.",
                        names[seat], winning, losing
                    ),
                )
            }
            None => (
                TIE.to_string(),
                "Exact tie: the reveal awards no point.".to_string(),
            ),
        };
        info!(
            "Room {}: reveal {} resolved, {} vs {}, winner {}",
            self.id, inner.round, card0, card1, reveal_winner
        );

        let mut last_reveal = HashMap::new();
        last_reveal.insert(names[0].clone(), card0);
        last_reveal.insert(names[1].clone(), card1);

        let update = self
            .game_update(inner, turn_message, last_reveal, reveal_winner)
            .await;
        self.broadcast(update).await;

        let hand_sizes = [
            self.players[0].hand_len().await,
            self.players[1].hand_len().await,
        ];
        if hand_sizes.contains(&0) {
            inner.state = RoomState::Finished;
            let winner = match inner.reveal_wins[0].cmp(&inner.reveal_wins[1]) {
                Ordering::Greater => names[0].clone(),
                Ordering::Less => names[1].clone(),
                Ordering::Equal => TIE.to_string(),
            };
            info!(
                "Room {}: match over after {} reveals, winner {}",
                self.id, inner.round, winner
            );
            self.broadcast(ServerEvent::GameOver { winner }).await;
        }
    }

    /// Broadcasts room chat to both players, sender included.
    pub async fn chat(&self, session: &Arc<Session>, text: String) -> Result<(), String> {
        {
            let inner = self.inner.lock().await;
            if inner.abandoned {
                return Err("The match is over.".to_string());
            }
            if self.seat_of(session.id).is_none() {
                return Err("You are not seated in this room.".to_string());
            }
        }
        let from = session.name().await;
        self.broadcast(ServerEvent::Chat { from, text }).await;
        Ok(())
    }

    /// Marks the room abandoned and returns the remaining player, who the
    /// caller notifies and re-enqueues. Idempotent: only the first caller
    /// gets the opponent back.
    pub async fn abandon(&self, leaver_id: u64) -> Option<Arc<Session>> {
        let mut inner = self.inner.lock().await;
        if inner.abandoned {
            return None;
        }
        inner.abandoned = true;
        inner.table = [None, None];
        info!("Room {}: abandoned", self.id);

        match self.seat_of(leaver_id) {
            Some(seat) => Some(self.players[1 - seat].clone()),
            None => {
                error!(
                    "Room {}: abandoned by session {} that holds no seat",
                    self.id, leaver_id
                );
                None
            }
        }
    }

    /// Clears all per-match state, including both hands, for a rematch.
    async fn reset_for_rematch(&self, inner: &mut RoomInner) {
        inner.state = RoomState::AwaitingPurchase;
        inner.table = [None, None];
        inner.purchased = [false, false];
        inner.ready = [false, false];
        inner.reveal_wins = [0, 0];
        inner.round = 0;
        for player in &self.players {
            player.hand_clear().await;
        }
        info!("Room {}: reset for a rematch", self.id);
    }

    async fn game_update(
        &self,
        inner: &RoomInner,
        turn_message: String,
        last_reveal: HashMap<String, Card>,
        reveal_winner: String,
    ) -> ServerEvent {
        let names = [self.players[0].name().await, self.players[1].name().await];
        let mut hand_sizes = HashMap::new();
        for (player, name) in self.players.iter().zip(names.iter()) {
            hand_sizes.insert(name.clone(), player.hand_len().await);
        }
        let round_winner = match inner.reveal_wins[0].cmp(&inner.reveal_wins[1]) {
            Ordering::Greater => names[0].clone(),
            Ordering::Less => names[1].clone(),
            Ordering::Equal => TIE.to_string(),
        };
        ServerEvent::GameUpdate(GameUpdate {
            turn_message,
            hand_sizes,
            last_reveal,
            reveal_winner,
            round_winner,
            round_number: inner.round,
        })
    }

    async fn broadcast(&self, event: ServerEvent) {
        for player in &self.players {
            player.send(event.clone()).await;
        }
    }
}
