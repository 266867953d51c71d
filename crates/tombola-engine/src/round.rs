//! round records and derived status

use serde::{Deserialize, Serialize};

use crate::tier::Tier;
use crate::types::{AccountId, Balance, RoundId, Timestamp, ValueHandle};

/// lifecycle status, derived from stored fields and the clock; never
/// stored separately so it cannot diverge from the flags
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundStatus {
    NotFound,
    Active,
    Ended,
    Settled,
    Cancelled,
}

/// one lottery round: price, time window, pool and reveal progress.
/// rounds are never deleted; settled and cancelled rounds remain as
/// historical record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Round {
    pub round_id: RoundId,
    pub creator: AccountId,
    pub ticket_price: Balance,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    /// grows with purchases, consumed by claims and refunds
    pub prize_pool: Balance,
    pub ticket_count: u64,
    pub cancelled: bool,
    pub settled: bool,
    /// reveal protocol: set when the random draw was handed to the oracle
    pub decryption_requested: bool,
    /// reveal protocol: set exactly once by the oracle callback
    pub winning_number_ready: bool,
    /// valid only when winning_number_ready
    pub revealed_winning_number: u64,
    /// handle of the encrypted random draw, consumed by the oracle request
    pub winning_number_handle: Option<ValueHandle>,
    /// pool size frozen at reveal time; claim denominators divide this
    pub settled_pool: Balance,
    /// winner counts per tier, populated by the confidential tally at
    /// reveal time
    pub tier1_winners: u64,
    pub tier2_winners: u64,
    pub tier3_winners: u64,
    /// claims paid so far per tier, each ticket at most once
    pub tier1_claimed: u64,
    pub tier2_claimed: u64,
    pub tier3_claimed: u64,
}

impl Round {
    pub fn new(
        round_id: &str,
        creator: AccountId,
        ticket_price: Balance,
        now: Timestamp,
        duration: u64,
    ) -> Self {
        Self {
            round_id: round_id.to_string(),
            creator,
            ticket_price,
            start_time: now,
            end_time: now + duration,
            prize_pool: 0,
            ticket_count: 0,
            cancelled: false,
            settled: false,
            decryption_requested: false,
            winning_number_ready: false,
            revealed_winning_number: 0,
            winning_number_handle: None,
            settled_pool: 0,
            tier1_winners: 0,
            tier2_winners: 0,
            tier3_winners: 0,
            tier1_claimed: 0,
            tier2_claimed: 0,
            tier3_claimed: 0,
        }
    }

    /// exactly one of active / ended / settled / cancelled holds
    pub fn status(&self, now: Timestamp) -> RoundStatus {
        if self.cancelled {
            RoundStatus::Cancelled
        } else if self.settled {
            RoundStatus::Settled
        } else if now >= self.end_time {
            RoundStatus::Ended
        } else {
            RoundStatus::Active
        }
    }

    pub fn is_active(&self, now: Timestamp) -> bool {
        self.status(now) == RoundStatus::Active
    }

    pub fn has_ended(&self, now: Timestamp) -> bool {
        now >= self.end_time
    }

    pub fn winners_in(&self, tier: Tier) -> u64 {
        match tier {
            Tier::Jackpot => self.tier1_winners,
            Tier::Silver => self.tier2_winners,
            Tier::Bronze => self.tier3_winners,
            Tier::None => 0,
        }
    }

    pub fn record_claim(&mut self, tier: Tier) {
        match tier {
            Tier::Jackpot => self.tier1_claimed += 1,
            Tier::Silver => self.tier2_claimed += 1,
            Tier::Bronze => self.tier3_claimed += 1,
            Tier::None => {}
        }
    }
}
