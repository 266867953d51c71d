//! error types for the settlement engine
//!
//! every operation returns a typed result; no failure mutates state and
//! none is swallowed. validation errors are retryable with corrected
//! input, state-conflict errors require re-reading state first.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    // === validation errors ===
    #[error("ticket price below minimum")]
    InvalidPrice,

    #[error("round duration out of bounds")]
    InvalidDuration,

    #[error("payment does not match ticket price")]
    WrongTicketPrice,

    #[error("ciphertext or proof rejected by co-processor")]
    InvalidCiphertext,

    #[error("declared number does not match stored ciphertext")]
    NumberMismatch,

    #[error("attested tier does not match computed tier")]
    TierMismatch,

    #[error("ticket is not in a winning tier")]
    NoPrize,

    // === state-conflict errors ===
    #[error("round id already exists")]
    RoundExists,

    #[error("round is not active")]
    RoundNotActive,

    #[error("round is still active")]
    RoundActive,

    #[error("caller already holds a ticket for this round")]
    AlreadyPurchased,

    #[error("decryption request already pending")]
    DecryptPending,

    #[error("winning number already revealed")]
    AlreadyRevealed,

    #[error("ticket already claimed")]
    AlreadyClaimed,

    #[error("round already cancelled")]
    AlreadyCancelled,

    #[error("round already settled")]
    AlreadySettled,

    #[error("round is not settled")]
    NotSettled,

    #[error("round is not cancelled")]
    NotCancelled,

    #[error("round is cancelled")]
    RoundCancelled,

    // === authorization errors ===
    #[error("only the round creator may do this")]
    OnlyCreator,

    // === not-found errors ===
    #[error("round not found")]
    RoundMissing,

    #[error("ticket not found")]
    TicketMissing,

    // === trust-boundary anomalies ===
    #[error("oracle callback without a pending request")]
    UnexpectedCallback,

    #[error("oracle delivered out-of-range winning number: {0}")]
    WinningNumberOutOfRange(u64),

    // === infrastructure ===
    #[error("storage error: {0}")]
    Storage(String),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("internal invariant violated: {0}")]
    Internal(String),
}

impl Error {
    /// stable machine-readable name, used by the api layer and event
    /// consumers
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidPrice => "InvalidPrice",
            Error::InvalidDuration => "InvalidDuration",
            Error::WrongTicketPrice => "WrongTicketPrice",
            Error::InvalidCiphertext => "InvalidCiphertext",
            Error::NumberMismatch => "NumberMismatch",
            Error::TierMismatch => "TierMismatch",
            Error::NoPrize => "NoPrize",
            Error::RoundExists => "RoundExists",
            Error::RoundNotActive => "RoundNotActive",
            Error::RoundActive => "RoundActive",
            Error::AlreadyPurchased => "AlreadyPurchased",
            Error::DecryptPending => "DecryptPending",
            Error::AlreadyRevealed => "AlreadyRevealed",
            Error::AlreadyClaimed => "AlreadyClaimed",
            Error::AlreadyCancelled => "AlreadyCancelled",
            Error::AlreadySettled => "AlreadySettled",
            Error::NotSettled => "NotSettled",
            Error::NotCancelled => "NotCancelled",
            Error::RoundCancelled => "RoundCancelled",
            Error::OnlyCreator => "OnlyCreator",
            Error::RoundMissing => "RoundMissing",
            Error::TicketMissing => "TicketMissing",
            Error::UnexpectedCallback => "UnexpectedCallback",
            Error::WinningNumberOutOfRange(_) => "WinningNumberOutOfRange",
            Error::Storage(_) => "Storage",
            Error::Codec(_) => "Codec",
            Error::Internal(_) => "Internal",
        }
    }
}
