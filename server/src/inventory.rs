//! Sharded card inventory with rarity sampling and downgrade
//!
//! The global card stock is split into N independent shards, each owning a
//! per-rarity bag of cards behind its own lock, so contention on any one
//! shard is roughly 1/N of global pack pressure. A draw targets a sampled
//! rarity in one uniformly chosen shard and walks the fixed downgrade chain
//! L → R → U → C from the target when the bag is empty. When the chosen
//! shard is empty at every rarity in the chain, a Common is synthesized with
//! a freshly minted id so pack purchases never block on depletion.
//!
//! Card ids come from one process-wide counter; a card exists in at most one
//! shard, and leaves the inventory permanently when drawn.

use crate::config::Config;
use log::info;
use rand::Rng;
use shared::{Card, Rarity, Suit};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Inclusive power band a freshly minted card of the given rarity rolls in.
fn power_band(rarity: Rarity) -> (u32, u32) {
    match rarity {
        Rarity::Common => (1, 6),
        Rarity::Uncommon => (4, 8),
        Rarity::Rare => (7, 11),
        Rarity::Legendary => (10, 13),
    }
}

/// The downgrade walk from a target rarity. A request never upgrades: a
/// Legendary target may fall all the way to Common, a Common target only
/// ever yields Common.
fn downgrade_chain(target: Rarity) -> &'static [Rarity] {
    match target {
        Rarity::Legendary => &[
            Rarity::Legendary,
            Rarity::Rare,
            Rarity::Uncommon,
            Rarity::Common,
        ],
        Rarity::Rare => &[Rarity::Rare, Rarity::Uncommon, Rarity::Common],
        Rarity::Uncommon => &[Rarity::Uncommon, Rarity::Common],
        Rarity::Common => &[Rarity::Common],
    }
}

/// One partition of the inventory: a bag of cards per rarity, all mutated
/// under the shard's own lock. The critical section of a draw is a single
/// swap-remove.
struct Shard {
    bags: Mutex<[Vec<Card>; 4]>,
}

impl Shard {
    fn new() -> Self {
        Self {
            bags: Mutex::new([Vec::new(), Vec::new(), Vec::new(), Vec::new()]),
        }
    }

    /// Takes one card at the first non-empty rarity on the downgrade walk
    /// from `target`, removing it at a uniformly random index in O(1).
    async fn take_with_downgrade(&self, target: Rarity) -> Option<Card> {
        let mut bags = self.bags.lock().await;
        for &rarity in downgrade_chain(target) {
            let bag = &mut bags[rarity as usize];
            if !bag.is_empty() {
                let index = rand::thread_rng().gen_range(0..bag.len());
                return Some(bag.swap_remove(index));
            }
        }
        None
    }

    async fn remaining(&self) -> usize {
        let bags = self.bags.lock().await;
        bags.iter().map(|bag| bag.len()).sum()
    }
}

/// The global card inventory.
pub struct Inventory {
    config: Config,
    shards: Vec<Shard>,
    next_card_id: AtomicU64,
}

impl Inventory {
    /// Mints the initial stock and distributes it round-robin across the
    /// shards. Per-rarity counts follow the configured weights, with
    /// rounding remainders landing on Common.
    pub fn new(config: &Config) -> Self {
        let mut inventory = Self {
            config: config.clone(),
            shards: (0..config.shard_count.max(1)).map(|_| Shard::new()).collect(),
            next_card_id: AtomicU64::new(1),
        };

        let mut counts = [0usize; 4];
        for (i, weight) in config.rarity_weights.iter().enumerate() {
            counts[i] = config.initial_cards * (*weight as usize) / 100;
        }
        counts[Rarity::Common as usize] += config.initial_cards - counts.iter().sum::<usize>();

        let mut shard_cursor = 0;
        for rarity in Rarity::ALL {
            for _ in 0..counts[rarity as usize] {
                let card = inventory.mint(rarity);
                let bags = inventory.shards[shard_cursor].bags.get_mut();
                bags[rarity as usize].push(card);
                shard_cursor = (shard_cursor + 1) % inventory.shards.len();
            }
        }

        info!(
            "Inventory ready: {} cards across {} shards (C/U/R/L = {}/{}/{}/{})",
            config.initial_cards,
            inventory.shards.len(),
            counts[0],
            counts[1],
            counts[2],
            counts[3]
        );
        inventory
    }

    /// Mints a card with a process-unique id, a random suit, and a power
    /// rolled inside the rarity's band.
    fn mint(&self, rarity: Rarity) -> Card {
        let id = self.next_card_id.fetch_add(1, Ordering::Relaxed);
        let mut rng = rand::thread_rng();
        let suit = Suit::ALL[rng.gen_range(0..Suit::ALL.len())];
        let (low, high) = power_band(rarity);
        let power = rng.gen_range(low..=high);
        Card {
            id: format!("card-{}", id),
            name: format!("{} of {}", power, suit.name()),
            suit,
            power,
            rarity,
        }
    }

    /// Samples a target rarity from the configured distribution.
    pub fn sample_rarity(&self) -> Rarity {
        let roll = rand::thread_rng().gen_range(0..100);
        self.config.rarity_for_roll(roll)
    }

    /// Draws one card for a sampled `target` rarity: uniform shard pick,
    /// downgrade walk inside that shard, synthesized Common if the shard is
    /// dry. Never blocks beyond the one shard lock and never fails.
    pub async fn draw(&self, target: Rarity) -> Card {
        let shard_index = rand::thread_rng().gen_range(0..self.shards.len());
        match self.shards[shard_index].take_with_downgrade(target).await {
            Some(card) => card,
            None => self.mint(Rarity::Common),
        }
    }

    /// Best-effort count of cards still in shards. Summed shard by shard
    /// without a global lock, so the figure is a snapshot, not a
    /// linearizable count.
    pub async fn remaining_total(&self) -> u64 {
        let mut total = 0u64;
        for shard in &self.shards {
            total += shard.remaining().await as u64;
        }
        total
    }
}
