//! confidential lottery settlement engine
//!
//! owns round lifecycle, accepts encrypted ticket purchases, coordinates
//! the asynchronous reveal of a random winning number against an external
//! decryption oracle, and settles tiered payouts and refunds. ticket
//! numbers are opaque handles end to end; plaintext enters durable state
//! at exactly one point, the oracle callback.
//!
//! ## flow
//!
//! ```text
//! create_round ──► purchase_ticket* ──► (end_time passes)
//!       │                                    │
//!       │                         request_winning_number
//!       │                                    │ fire-and-forget
//!       ▼                                    ▼
//!  cancel_round ──► claim_refund*   on_winning_number_decrypted
//!                                            │
//!                                            ▼
//!                                      claim_prize*
//! ```
//!
//! the engine is a single authoritative state owner: operations are
//! applied one at a time and in full, and racing callers are resolved
//! purely by the invariants (second purchase for the same address fails
//! `AlreadyPurchased`, second reveal request fails `DecryptPending`, and
//! so on). all confidential computation is delegated through the
//! [`Coprocessor`] boundary.

pub mod coprocessor;
pub mod engine;
pub mod error;
pub mod events;
pub mod round;
pub mod store;
pub mod ticket;
pub mod tier;
pub mod types;

pub use coprocessor::{Coprocessor, LocalCoprocessor, PendingDecryption, TierTally};
pub use engine::{PrizePayout, SettlementEngine};
pub use error::{Error, Result};
pub use events::Event;
pub use round::{Round, RoundStatus};
pub use store::Store;
pub use ticket::Ticket;
pub use tier::{classify, payout_share, Tier};
pub use types::{
    AccountId, Balance, RoundId, Timestamp, ValueHandle, MAX_DURATION, MAX_NUMBER, MIN_DURATION,
    MIN_TICKET_PRICE,
};
