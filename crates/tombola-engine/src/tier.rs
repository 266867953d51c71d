//! prize tier bands and payout shares
//!
//! pure arithmetic over revealed plaintexts; nothing here touches
//! encrypted state.

use serde::{Deserialize, Serialize};

use crate::types::Balance;

/// prize tier, determined by distance between a player's number and the
/// revealed winning number
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    /// no prize (distance > 10)
    None,
    /// exact match
    Jackpot,
    /// distance 1..=5
    Silver,
    /// distance 6..=10
    Bronze,
}

impl Tier {
    /// tier from its wire index (0..=3)
    pub fn from_index(index: u8) -> Option<Tier> {
        match index {
            0 => Some(Tier::None),
            1 => Some(Tier::Jackpot),
            2 => Some(Tier::Silver),
            3 => Some(Tier::Bronze),
            _ => None,
        }
    }

    pub fn index(self) -> u8 {
        match self {
            Tier::None => 0,
            Tier::Jackpot => 1,
            Tier::Silver => 2,
            Tier::Bronze => 3,
        }
    }

    /// percentage of the prize pool allocated to this tier; shares sum
    /// to 100 across the winning tiers
    pub fn share_percent(self) -> Balance {
        match self {
            Tier::None => 0,
            Tier::Jackpot => 50,
            Tier::Silver => 30,
            Tier::Bronze => 20,
        }
    }
}

/// classify a declared number against the revealed winning number
pub fn classify(winning: u64, declared: u64) -> Tier {
    match winning.abs_diff(declared) {
        0 => Tier::Jackpot,
        1..=5 => Tier::Silver,
        6..=10 => Tier::Bronze,
        _ => Tier::None,
    }
}

/// per-winner payout: the tier's slice of the pool split evenly among
/// its winners. integer division truncates; residual dust stays in the
/// pool and is never distributed.
pub fn payout_share(pool: Balance, tier: Tier, winners: u64) -> Balance {
    if winners == 0 {
        return 0;
    }
    pool * tier.share_percent() / 100 / winners as Balance
}
