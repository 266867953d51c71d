//! append-only event log for external indexers

use serde::{Deserialize, Serialize};

use crate::types::{AccountId, Balance, RoundId, Timestamp};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    RoundCreated {
        round_id: RoundId,
        creator: AccountId,
        ticket_price: Balance,
        start_time: Timestamp,
        end_time: Timestamp,
    },
    TicketPurchased {
        round_id: RoundId,
        owner: AccountId,
        payment: Balance,
    },
    WinningNumberRequested {
        round_id: RoundId,
    },
    WinningNumberRevealed {
        round_id: RoundId,
        winning_number: u64,
        tier1_winners: u64,
        tier2_winners: u64,
        tier3_winners: u64,
    },
    PrizeClaimed {
        round_id: RoundId,
        owner: AccountId,
        tier: u8,
        amount: Balance,
    },
    RefundClaimed {
        round_id: RoundId,
        owner: AccountId,
        amount: Balance,
    },
    RoundCancelled {
        round_id: RoundId,
    },
}

impl Event {
    pub fn round_id(&self) -> &str {
        match self {
            Event::RoundCreated { round_id, .. }
            | Event::TicketPurchased { round_id, .. }
            | Event::WinningNumberRequested { round_id }
            | Event::WinningNumberRevealed { round_id, .. }
            | Event::PrizeClaimed { round_id, .. }
            | Event::RefundClaimed { round_id, .. }
            | Event::RoundCancelled { round_id } => round_id,
        }
    }
}
