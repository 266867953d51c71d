//! confidential tickets
//!
//! a ticket holds only the opaque handle of the player's encrypted
//! number; the engine never sees the plaintext until the player claims.

use serde::{Deserialize, Serialize};

use crate::types::{AccountId, RoundId, Timestamp, ValueHandle};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ticket {
    pub round_id: RoundId,
    pub owner: AccountId,
    pub purchase_time: Timestamp,
    pub number_handle: ValueHandle,
    /// set exactly once, by a prize claim or a refund
    pub claimed: bool,
}

impl Ticket {
    pub fn new(
        round_id: &str,
        owner: AccountId,
        purchase_time: Timestamp,
        number_handle: ValueHandle,
    ) -> Self {
        Self {
            round_id: round_id.to_string(),
            owner,
            purchase_time,
            number_handle,
            claimed: false,
        }
    }
}
