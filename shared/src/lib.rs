//! # Shared Protocol Library
//!
//! This crate contains everything the card-duel server and its clients must
//! agree on: the card model, the complete command/event vocabulary, and the
//! wire framing. It is the single source of truth for the protocol so that
//! the server, the terminal client, and the stress harness cannot drift
//! apart.
//!
//! ## Wire Format
//!
//! Every message is a self-contained JSON object of the form
//! `{"comando": <string>, "dados": <payload>}`, one object per line. The
//! envelope is expressed here as serde adjacently-tagged enums
//! ([`ClientCommand`] and [`ServerEvent`]), so the tag/payload pairing is
//! checked at compile time rather than hand-assembled. Framing is
//! newline-delimited: [`write_frame`] appends the terminator, [`read_frame`]
//! scans for it under a hard size cap, and `serde_json` never emits a raw
//! newline inside a document, so the boundary is unambiguous.
//!
//! ## Message Categories
//!
//! ### Client → Server
//! Connection and identity (`LOGIN`, `QUIT`, `KEEPALIVE_REPLY`),
//! matchmaking (`ENQUEUE`), and gameplay (`BUY_PACK`, `PLAY_CARD`,
//! `SEND_CHAT`, `LEAVE_ROOM`).
//!
//! ### Server → Client
//! Match lifecycle (`MATCH_FOUND`, `GAME_UPDATE`, `GAME_OVER`), purchases
//! (`PACK_RESULT`), room chat (`CHAT`), notices and failures (`SYSTEM`,
//! `ERROR`), and liveness probes (`KEEPALIVE`).
//!
//! ## Card Model
//!
//! Cards are immutable values minted once by the server, each with a
//! process-unique id. Comparison is by `power` first, then by suit in the
//! fixed order ♠ > ♥ > ♦ > ♣; two cards compare equal only when both power
//! and suit match, and such an exact tie awards the reveal to neither
//! player. Rarity tags (C, U, R, L) describe how a card was drawn, not how
//! it scores.
//!
//! ## Design Principles
//!
//! - **Forward compatible**: decoders tolerate unknown payload fields, so
//!   either side can grow a payload without breaking older peers.
//! - **Typed envelope**: commands and events are enums, not ad-hoc maps;
//!   an unknown tag fails to parse instead of silently half-working.
//! - **Bounded ingress**: a frame longer than [`MAX_FRAME_BYTES`] is an
//!   error, so a hostile peer cannot grow the read buffer without bound.
//!
//! ## Usage Example
//!
//! ```rust
//! use shared::{ClientCommand, ServerEvent};
//!
//! // A client asks to join the matchmaking queue:
//! let json = serde_json::to_string(&ClientCommand::Enqueue).unwrap();
//! assert_eq!(json, r#"{"comando":"ENQUEUE"}"#);
//!
//! // The server answers with events such as:
//! let event = ServerEvent::System {
//!     text: "Waiting for an opponent...".to_string(),
//! };
//! let raw = serde_json::to_string(&event).unwrap();
//! let echoed: ServerEvent = serde_json::from_str(&raw).unwrap();
//! assert_eq!(echoed, event);
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Default TCP port the server listens on.
pub const DEFAULT_PORT: u16 = 65432;

/// Upper bound on a single wire frame, applied while scanning for the
/// line terminator so a peer cannot grow our read buffer without bound.
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

/// The four suits in their tie-break order: ♠ beats ♥ beats ♦ beats ♣.
///
/// The ordering is deliberate, not derive order: [`Suit::rank`] assigns
/// ♣ the lowest rank and ♠ the highest, and `Ord` delegates to it.
///
/// # Example
/// ```rust
/// use shared::Suit;
///
/// assert!(Suit::Spades > Suit::Hearts);
/// assert!(Suit::Hearts > Suit::Diamonds);
/// assert!(Suit::Diamonds > Suit::Clubs);
/// assert_eq!(Suit::Spades.symbol(), "♠");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Suit {
    #[serde(rename = "♠")]
    Spades,
    #[serde(rename = "♥")]
    Hearts,
    #[serde(rename = "♦")]
    Diamonds,
    #[serde(rename = "♣")]
    Clubs,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];

    /// Tie-break rank; higher wins a power tie.
    pub fn rank(self) -> u8 {
        match self {
            Suit::Clubs => 0,
            Suit::Diamonds => 1,
            Suit::Hearts => 2,
            Suit::Spades => 3,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Suit::Spades => "♠",
            Suit::Hearts => "♥",
            Suit::Diamonds => "♦",
            Suit::Clubs => "♣",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Suit::Spades => "Spades",
            Suit::Hearts => "Hearts",
            Suit::Diamonds => "Diamonds",
            Suit::Clubs => "Clubs",
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl PartialOrd for Suit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Suit {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

/// Card rarity tags. Declaration order doubles as the rarity ordering, so
/// `Rarity::Common < Rarity::Legendary` holds via the derived `Ord` — the
/// property the inventory's downgrade walk relies on.
///
/// On the wire a rarity is its single-letter tag:
///
/// ```rust
/// use shared::Rarity;
///
/// assert_eq!(serde_json::to_string(&Rarity::Legendary).unwrap(), "\"L\"");
/// assert!(Rarity::Common < Rarity::Legendary);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rarity {
    #[serde(rename = "C")]
    Common,
    #[serde(rename = "U")]
    Uncommon,
    #[serde(rename = "R")]
    Rare,
    #[serde(rename = "L")]
    Legendary,
}

impl Rarity {
    pub const ALL: [Rarity; 4] = [
        Rarity::Common,
        Rarity::Uncommon,
        Rarity::Rare,
        Rarity::Legendary,
    ];

    pub fn letter(self) -> &'static str {
        match self {
            Rarity::Common => "C",
            Rarity::Uncommon => "U",
            Rarity::Rare => "R",
            Rarity::Legendary => "L",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}

/// A single playing card.
///
/// Cards are values: once minted their fields never change, and the id is
/// unique across the entire server process. Ownership moves from an
/// inventory shard into a player's hand and is consumed on play — a
/// revealed card is never observable anywhere afterwards.
///
/// # Fields
/// - `id`: process-unique identifier, the handle used by `PLAY_CARD`
/// - `name`: human-readable label shown by clients
/// - `suit`: tie-break suit, serialized as its symbol
/// - `power`: primary comparison value
/// - `rarity`: the tag the card was drawn (or synthesized) under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub name: String,
    pub suit: Suit,
    pub power: u32,
    pub rarity: Rarity,
}

impl Card {
    /// Compares two cards under the reveal rules: power first, suit rank on
    /// a power tie. `Ordering::Equal` means an exact tie (same power, same
    /// suit) and awards the reveal to neither player.
    ///
    /// # Example
    /// ```rust
    /// use shared::{Card, Rarity, Suit};
    /// use std::cmp::Ordering;
    ///
    /// let make = |id: &str, power, suit| Card {
    ///     id: id.to_string(),
    ///     name: format!("{} of {}", power, Suit::name(suit)),
    ///     suit,
    ///     power,
    ///     rarity: Rarity::Common,
    /// };
    ///
    /// // Higher power wins outright.
    /// assert_eq!(make("a", 9, Suit::Clubs).duel(&make("b", 2, Suit::Spades)), Ordering::Greater);
    ///
    /// // Equal power falls back to the suit order ♠ > ♥ > ♦ > ♣.
    /// assert_eq!(make("a", 7, Suit::Spades).duel(&make("b", 7, Suit::Hearts)), Ordering::Greater);
    ///
    /// // Same power and suit is an exact tie.
    /// assert_eq!(make("a", 5, Suit::Diamonds).duel(&make("b", 5, Suit::Diamonds)), Ordering::Equal);
    /// ```
    pub fn duel(&self, other: &Card) -> Ordering {
        self.power
            .cmp(&other.power)
            .then(self.suit.cmp(&other.suit))
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} [{}]", self.power, self.suit, self.rarity)
    }
}

/// Commands a client may send, tagged with the wire vocabulary.
///
/// Serializes as `{"comando": "LOGIN", "dados": {"name": "..."}}` and so
/// on; commands without a payload omit `dados` entirely. Unknown fields
/// inside a payload are ignored on decode, unknown tags are rejected.
///
/// # Example
/// ```rust
/// use shared::ClientCommand;
///
/// let command = ClientCommand::Login {
///     name: "Alice".to_string(),
/// };
/// let json = serde_json::to_string(&command).unwrap();
/// assert_eq!(json, r#"{"comando":"LOGIN","dados":{"name":"Alice"}}"#);
///
/// let parsed: ClientCommand = serde_json::from_str(&json).unwrap();
/// assert_eq!(parsed, command);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "comando", content = "dados", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientCommand {
    /// Sets the display name. Repeatable; the last name wins.
    Login { name: String },
    /// Offers this session to the matchmaker.
    Enqueue,
    /// Requests `count` packs. Only valid inside a room, once per match.
    BuyPack { count: u32 },
    /// Places the identified card from the hand onto the table.
    PlayCard { card_id: String },
    /// Broadcasts chat to the room.
    SendChat { text: String },
    /// Abandons the current match.
    LeaveRoom,
    /// Echoes a keepalive probe back; carries the probe's timestamp.
    KeepaliveReply { timestamp_ms: u64 },
    /// Closes the session.
    Quit,
}

/// Events the server pushes to clients.
///
/// Decoders must tolerate unknown payload fields so the server can grow an
/// event without breaking older clients:
///
/// ```rust
/// use shared::ServerEvent;
///
/// let raw = r#"{"comando":"MATCH_FOUND",
///               "dados":{"room_id":"room-7","opponent_name":"Bob","queue_ms":120}}"#;
/// let event: ServerEvent = serde_json::from_str(raw).unwrap();
/// assert_eq!(
///     event,
///     ServerEvent::MatchFound {
///         room_id: "room-7".to_string(),
///         opponent_name: "Bob".to_string(),
///     }
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "comando", content = "dados", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerEvent {
    /// The matchmaker paired this session; a room has been created.
    ///
    /// # Fields
    /// - `room_id`: identifier of the freshly created room
    /// - `opponent_name`: the paired player's display name
    MatchFound {
        room_id: String,
        opponent_name: String,
    },
    /// Snapshot of the match after a state change or reveal.
    GameUpdate(GameUpdate),
    /// The match ended. `winner` is a display name or `"TIE"`.
    GameOver { winner: String },
    /// One purchased pack. Always exactly pack-size cards.
    ///
    /// # Fields
    /// - `cards`: the delivered cards, already appended to the hand
    /// - `stock_remaining`: best-effort count of cards left in the global
    ///   inventory after this draw
    PackResult {
        cards: Vec<Card>,
        stock_remaining: u64,
    },
    /// Room chat, delivered to both players including the sender.
    Chat { from: String, text: String },
    /// A human-readable notice (precondition failures, opponent left, ...).
    System { text: String },
    /// An operation failed and was abandoned without effect.
    Error { text: String },
    /// Periodic liveness probe; clients answer with KEEPALIVE_REPLY.
    Keepalive { timestamp_ms: u64 },
}

/// Payload of [`ServerEvent::GameUpdate`].
///
/// `hand_sizes` and `last_reveal` are keyed by display name. `reveal_winner`
/// names the winner of the reveal just resolved (or `"TIE"`, or empty when
/// no reveal resolved yet); `round_winner` names the player currently ahead
/// on reveals this match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameUpdate {
    pub turn_message: String,
    pub hand_sizes: HashMap<String, usize>,
    pub last_reveal: HashMap<String, Card>,
    pub reveal_winner: String,
    pub round_winner: String,
    pub round_number: u32,
}

/// Tag used for drawn reveals and drawn matches.
pub const TIE: &str = "TIE";

/// Reads one newline-terminated frame, skipping blank lines.
///
/// Returns `Ok(None)` on a clean EOF at a frame boundary. A frame longer
/// than [`MAX_FRAME_BYTES`] or one that is not UTF-8 is an
/// `InvalidData` error; the connection should be dropped rather than
/// resynchronized.
///
/// # Example
/// ```rust
/// use shared::{read_frame, write_frame, ClientCommand};
/// use tokio::io::BufReader;
///
/// # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// # rt.block_on(async {
/// let mut wire = Vec::new();
/// write_frame(&mut wire, &ClientCommand::Enqueue).await.unwrap();
///
/// let mut reader = BufReader::new(wire.as_slice());
/// let line = read_frame(&mut reader).await.unwrap().expect("one frame");
/// let command: ClientCommand = serde_json::from_str(&line).unwrap();
/// assert_eq!(command, ClientCommand::Enqueue);
///
/// // The stream is exhausted at a frame boundary: clean EOF.
/// assert!(read_frame(&mut reader).await.unwrap().is_none());
/// # });
/// ```
pub async fn read_frame<R: AsyncBufRead + Unpin>(reader: &mut R) -> io::Result<Option<String>> {
    let mut frame = Vec::new();
    loop {
        let chunk = reader.fill_buf().await?;
        if chunk.is_empty() {
            // EOF mid-frame means the peer died between bytes.
            return if frame.is_empty() {
                Ok(None)
            } else {
                Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed inside a frame",
                ))
            };
        }

        if let Some(pos) = chunk.iter().position(|&b| b == b'\n') {
            frame.extend_from_slice(&chunk[..pos]);
            reader.consume(pos + 1);

            if frame.len() > MAX_FRAME_BYTES {
                return Err(io::Error::new(io::ErrorKind::InvalidData, "frame too large"));
            }
            let line = String::from_utf8(std::mem::take(&mut frame))
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            if line.trim().is_empty() {
                continue;
            }
            return Ok(Some(line));
        }

        let len = chunk.len();
        frame.extend_from_slice(chunk);
        reader.consume(len);
        if frame.len() > MAX_FRAME_BYTES {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "frame too large"));
        }
    }
}

/// Serializes `msg` and writes it as one newline-terminated frame.
///
/// `serde_json` never emits a raw newline inside a document, so the line
/// terminator is unambiguous.
///
/// # Example
/// ```rust
/// use shared::{write_frame, ServerEvent};
///
/// # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// # rt.block_on(async {
/// let mut wire = Vec::new();
/// let event = ServerEvent::Keepalive { timestamp_ms: 42 };
/// write_frame(&mut wire, &event).await.unwrap();
///
/// assert!(wire.ends_with(b"\n"));
/// assert_eq!(
///     std::str::from_utf8(&wire).unwrap().trim_end(),
///     r#"{"comando":"KEEPALIVE","dados":{"timestamp_ms":42}}"#
/// );
/// # });
/// ```
pub async fn write_frame<W, T>(writer: &mut W, msg: &T) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut data =
        serde_json::to_vec(msg).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    data.push(b'\n');
    writer.write_all(&data).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    fn card(id: &str, power: u32, suit: Suit) -> Card {
        Card {
            id: id.to_string(),
            name: format!("{} {}", suit.name(), power),
            suit,
            power,
            rarity: Rarity::Common,
        }
    }

    #[test]
    fn test_suit_order() {
        assert!(Suit::Spades > Suit::Hearts);
        assert!(Suit::Hearts > Suit::Diamonds);
        assert!(Suit::Diamonds > Suit::Clubs);
    }

    #[test]
    fn test_rarity_order() {
        assert!(Rarity::Common < Rarity::Uncommon);
        assert!(Rarity::Uncommon < Rarity::Rare);
        assert!(Rarity::Rare < Rarity::Legendary);
    }

    #[test]
    fn test_duel_by_power() {
        let seven = card("a", 7, Suit::Clubs);
        let nine = card("b", 9, Suit::Clubs);
        assert_eq!(seven.duel(&nine), Ordering::Less);
        assert_eq!(nine.duel(&seven), Ordering::Greater);
    }

    #[test]
    fn test_duel_tie_broken_by_suit() {
        // Equal power: ♠ beats ♥.
        let spades = card("a", 7, Suit::Spades);
        let hearts = card("b", 7, Suit::Hearts);
        assert_eq!(spades.duel(&hearts), Ordering::Greater);
        assert_eq!(hearts.duel(&spades), Ordering::Less);
    }

    #[test]
    fn test_duel_exact_tie() {
        let a = card("a", 5, Suit::Diamonds);
        let b = card("b", 5, Suit::Diamonds);
        assert_eq!(a.duel(&b), Ordering::Equal);
    }

    #[test]
    fn test_command_envelope_shape() {
        let cmd = ClientCommand::Login {
            name: "Alice".to_string(),
        };
        let json: serde_json::Value = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["comando"], "LOGIN");
        assert_eq!(json["dados"]["name"], "Alice");
    }

    #[test]
    fn test_payloadless_command_envelope() {
        let json = serde_json::to_string(&ClientCommand::Enqueue).unwrap();
        let parsed: ClientCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ClientCommand::Enqueue);
        assert_eq!(json, r#"{"comando":"ENQUEUE"}"#);
    }

    #[test]
    fn test_command_roundtrip() {
        let commands = vec![
            ClientCommand::Login {
                name: "Bob".to_string(),
            },
            ClientCommand::Enqueue,
            ClientCommand::BuyPack { count: 2 },
            ClientCommand::PlayCard {
                card_id: "card-17".to_string(),
            },
            ClientCommand::SendChat {
                text: "gl hf".to_string(),
            },
            ClientCommand::LeaveRoom,
            ClientCommand::KeepaliveReply { timestamp_ms: 42 },
            ClientCommand::Quit,
        ];

        for cmd in commands {
            let json = serde_json::to_string(&cmd).unwrap();
            let parsed: ClientCommand = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, cmd);
        }
    }

    #[test]
    fn test_unknown_payload_fields_tolerated() {
        let raw = r#"{"comando":"LOGIN","dados":{"name":"Alice","client_build":"2.4"}}"#;
        let parsed: ClientCommand = serde_json::from_str(raw).unwrap();
        assert_eq!(
            parsed,
            ClientCommand::Login {
                name: "Alice".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_command_rejected() {
        let raw = r#"{"comando":"TRADE_CARDS","dados":{}}"#;
        assert!(serde_json::from_str::<ClientCommand>(raw).is_err());
    }

    #[test]
    fn test_event_roundtrip() {
        let events = vec![
            ServerEvent::MatchFound {
                room_id: "room-1".to_string(),
                opponent_name: "Bob".to_string(),
            },
            ServerEvent::GameOver {
                winner: TIE.to_string(),
            },
            ServerEvent::PackResult {
                cards: vec![card("card-1", 3, Suit::Hearts)],
                stock_remaining: 99,
            },
            ServerEvent::Chat {
                from: "Alice".to_string(),
                text: "hi".to_string(),
            },
            ServerEvent::System {
                text: "opponent left".to_string(),
            },
            ServerEvent::Error {
                text: "server busy".to_string(),
            },
            ServerEvent::Keepalive { timestamp_ms: 7 },
        ];

        for event in events {
            let json = serde_json::to_string(&event).unwrap();
            let parsed: ServerEvent = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, event);
        }
    }

    #[test]
    fn test_game_update_roundtrip() {
        let mut hand_sizes = HashMap::new();
        hand_sizes.insert("Alice".to_string(), 4);
        hand_sizes.insert("Bob".to_string(), 5);
        let mut last_reveal = HashMap::new();
        last_reveal.insert("Alice".to_string(), card("card-2", 7, Suit::Spades));
        last_reveal.insert("Bob".to_string(), card("card-3", 7, Suit::Hearts));

        let event = ServerEvent::GameUpdate(GameUpdate {
            turn_message: "Reveal resolved".to_string(),
            hand_sizes,
            last_reveal,
            reveal_winner: "Alice".to_string(),
            round_winner: "Alice".to_string(),
            round_number: 1,
        });

        let json = serde_json::to_string(&event).unwrap();
        let parsed: ServerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_card_suit_serializes_as_symbol() {
        let json = serde_json::to_value(card("card-9", 7, Suit::Spades)).unwrap();
        assert_eq!(json["suit"], "♠");
        assert_eq!(json["rarity"], "C");
    }

    #[tokio::test]
    async fn test_frame_roundtrip() {
        let mut buf = Vec::new();
        let event = ServerEvent::System {
            text: "hello".to_string(),
        };
        write_frame(&mut buf, &event).await.unwrap();
        write_frame(&mut buf, &ClientCommand::Enqueue).await.unwrap();

        let mut reader = BufReader::new(buf.as_slice());
        let first = read_frame(&mut reader).await.unwrap().unwrap();
        let parsed: ServerEvent = serde_json::from_str(&first).unwrap();
        assert_eq!(parsed, event);

        let second = read_frame(&mut reader).await.unwrap().unwrap();
        let parsed: ClientCommand = serde_json::from_str(&second).unwrap();
        assert_eq!(parsed, ClientCommand::Enqueue);

        assert!(read_frame(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_frame_skips_blank_lines() {
        let mut reader = BufReader::new(&b"\n\n{\"comando\":\"QUIT\"}\n"[..]);
        let line = read_frame(&mut reader).await.unwrap().unwrap();
        let parsed: ClientCommand = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, ClientCommand::Quit);
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let mut data = vec![b'x'; MAX_FRAME_BYTES + 1];
        data.push(b'\n');
        let mut reader = BufReader::new(data.as_slice());
        let err = read_frame(&mut reader).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn test_eof_inside_frame_is_error() {
        let mut reader = BufReader::new(&b"{\"comando\":\"QUIT\""[..]);
        let err = read_frame(&mut reader).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
