//! # Card Duel Server Library
//!
//! The authoritative server for a two-player competitive card game played
//! over persistent TCP connections. Clients authenticate by display name,
//! queue for matchmaking, buy card packs from a shared sharded inventory,
//! and play turn-based elimination matches against a paired opponent.
//!
//! ## Architecture
//!
//! One long-running process, one TCP listener. Each accepted connection
//! becomes a session with a reader task, a writer task draining a bounded
//! mailbox, and a keepalive task. Sessions talk to three shared subsystems:
//!
//! - the **matchmaker** ([`matchmaker`]) — a single-slot first-come,
//!   first-served pairer;
//! - the **inventory** ([`inventory`]) — N independent shards of cards
//!   grouped by rarity, drained by a fixed pool of pack workers
//!   ([`pack_workers`]) consuming a bounded request queue;
//! - the **rooms** ([`room`]) — one state machine per match, serializing
//!   its own transitions behind its own lock.
//!
//! Data flows bytes → reader → dispatcher → (matchmaker | pack queue |
//! room) → per-session mailboxes → writer → bytes. No component blocks on
//! another beyond the minimal critical section, and a slow client only ever
//! stalls itself: mailbox inserts are bounded, timed, and dropped on
//! overflow.
//!
//! State is in-memory only; identity is a self-declared name. The wire
//! protocol lives in the `shared` crate.

pub mod config;
pub mod inventory;
pub mod matchmaker;
pub mod pack_workers;
pub mod room;
pub mod server;
pub mod session;
