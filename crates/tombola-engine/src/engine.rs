//! the settlement engine: single authoritative owner of round and
//! ticket state
//!
//! every operation validates fully before mutating anything
//! (read-check-then-write), executes atomically from the caller's point
//! of view, and reports failures as typed results. time enters as an
//! explicit `now` argument so instances are testable in isolation.

use tracing::{error, info, warn};

use crate::coprocessor::Coprocessor;
use crate::error::{Error, Result};
use crate::events::Event;
use crate::round::{Round, RoundStatus};
use crate::store::Store;
use crate::ticket::Ticket;
use crate::tier::{self, Tier};
use crate::types::{
    AccountId, Balance, RoundId, Timestamp, MAX_DURATION, MAX_NUMBER, MIN_DURATION,
    MIN_TICKET_PRICE,
};

/// payout receipt from a successful prize claim
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrizePayout {
    pub tier: Tier,
    pub amount: Balance,
}

pub struct SettlementEngine<C: Coprocessor> {
    store: Store,
    coprocessor: C,
}

impl<C: Coprocessor> SettlementEngine<C> {
    pub fn new(store: Store, coprocessor: C) -> Self {
        Self { store, coprocessor }
    }

    pub fn open(path: &str, coprocessor: C) -> Result<Self> {
        Ok(Self::new(Store::open(path)?, coprocessor))
    }

    pub fn coprocessor(&self) -> &C {
        &self.coprocessor
    }

    pub fn coprocessor_mut(&mut self) -> &mut C {
        &mut self.coprocessor
    }

    // === round registry ===

    pub fn create_round(
        &mut self,
        caller: AccountId,
        round_id: &str,
        ticket_price: Balance,
        duration: u64,
        now: Timestamp,
    ) -> Result<Round> {
        if self.store.get_round(round_id)?.is_some() {
            return Err(Error::RoundExists);
        }
        if ticket_price < MIN_TICKET_PRICE {
            return Err(Error::InvalidPrice);
        }
        if !(MIN_DURATION..=MAX_DURATION).contains(&duration) {
            return Err(Error::InvalidDuration);
        }

        let round = Round::new(round_id, caller, ticket_price, now, duration);
        self.store.insert_round(&round)?;
        self.store.append_event(&Event::RoundCreated {
            round_id: round_id.to_string(),
            creator: caller,
            ticket_price,
            start_time: round.start_time,
            end_time: round.end_time,
        })?;

        info!(round_id, ticket_price, duration, "round created");
        Ok(round)
    }

    pub fn get_round(&self, round_id: &str) -> Result<Round> {
        self.store.get_round(round_id)?.ok_or(Error::RoundMissing)
    }

    pub fn list_round_ids(&self) -> Result<Vec<RoundId>> {
        self.store.round_ids()
    }

    /// derived status; absent rounds report NotFound instead of failing
    pub fn round_status(&self, round_id: &str, now: Timestamp) -> Result<RoundStatus> {
        Ok(match self.store.get_round(round_id)? {
            Some(round) => round.status(now),
            None => RoundStatus::NotFound,
        })
    }

    // === ticket ledger ===

    pub fn purchase_ticket(
        &mut self,
        caller: AccountId,
        round_id: &str,
        ciphertext: &[u8],
        proof: &[u8],
        payment: Balance,
        now: Timestamp,
    ) -> Result<Ticket> {
        let mut round = self.get_round(round_id)?;
        if round.cancelled || round.has_ended(now) {
            return Err(Error::RoundNotActive);
        }
        // the duplicate check precedes the payment check so a repeat
        // buyer always sees AlreadyPurchased, whatever they paid
        if self.store.get_ticket(round_id, &caller)?.is_some() {
            return Err(Error::AlreadyPurchased);
        }
        if payment != round.ticket_price {
            return Err(Error::WrongTicketPrice);
        }

        // the handle is all we ever store; the plaintext number stays
        // behind the co-processor boundary
        let handle = self
            .coprocessor
            .validate_and_register(ciphertext, proof, caller)?;

        let ticket = Ticket::new(round_id, caller, now, handle);
        self.store.insert_ticket(&ticket)?;

        round.ticket_count += 1;
        round.prize_pool += payment;
        self.store.put_round(&round)?;

        self.store.append_event(&Event::TicketPurchased {
            round_id: round_id.to_string(),
            owner: caller,
            payment,
        })?;

        info!(round_id, owner = %caller.to_hex(), "ticket purchased");
        Ok(ticket)
    }

    pub fn get_ticket(&self, round_id: &str, owner: &AccountId) -> Result<Ticket> {
        // a missing round and a missing ticket both surface as
        // TicketMissing for reads; writes distinguish them
        self.store
            .get_ticket(round_id, owner)?
            .ok_or(Error::TicketMissing)
    }

    // === reveal protocol ===

    /// one-shot: draw an encrypted random winning number and hand it to
    /// the decryption oracle. completion arrives out-of-band via
    /// [`Self::on_winning_number_decrypted`].
    pub fn request_winning_number(
        &mut self,
        caller: AccountId,
        round_id: &str,
        now: Timestamp,
    ) -> Result<()> {
        let mut round = self.get_round(round_id)?;
        if caller != round.creator {
            return Err(Error::OnlyCreator);
        }
        if round.cancelled {
            return Err(Error::RoundCancelled);
        }
        if !round.has_ended(now) {
            return Err(Error::RoundActive);
        }
        if round.winning_number_ready {
            return Err(Error::AlreadyRevealed);
        }
        if round.decryption_requested {
            return Err(Error::DecryptPending);
        }

        let handle = self.coprocessor.draw_random(MAX_NUMBER)?;
        round.winning_number_handle = Some(handle);
        round.decryption_requested = true;
        self.coprocessor.request_decryption(handle, round_id)?;
        self.store.put_round(&round)?;

        self.store.append_event(&Event::WinningNumberRequested {
            round_id: round_id.to_string(),
        })?;

        info!(round_id, "winning number drawn, decryption requested");
        Ok(())
    }

    /// oracle callback: the single point where plaintext enters durable
    /// state. a repeated callback for an already-revealed round is a
    /// logged no-op; a malformed one leaves the round in its pending
    /// state.
    pub fn on_winning_number_decrypted(&mut self, round_id: &str, value: u64) -> Result<()> {
        let mut round = self.get_round(round_id)?;

        if round.winning_number_ready {
            warn!(round_id, value, "duplicate oracle callback ignored");
            return Ok(());
        }
        if !round.decryption_requested {
            error!(round_id, value, "oracle callback without pending request");
            return Err(Error::UnexpectedCallback);
        }
        if value == 0 || value > MAX_NUMBER {
            error!(round_id, value, "oracle delivered out-of-range value");
            return Err(Error::WinningNumberOutOfRange(value));
        }

        // aggregate confidential tally fixes the claim denominators;
        // only the three counts are decrypted, never ticket numbers
        let owners = self.store.participants(round_id)?;
        let mut handles = Vec::with_capacity(owners.len());
        for owner in &owners {
            let ticket = self
                .store
                .get_ticket(round_id, owner)?
                .ok_or_else(|| Error::Internal("participant index without ticket".into()))?;
            handles.push(ticket.number_handle);
        }
        let tally = self.coprocessor.tally_tiers(&handles, value)?;

        round.revealed_winning_number = value;
        round.winning_number_ready = true;
        round.settled = true;
        round.settled_pool = round.prize_pool;
        round.tier1_winners = tally.jackpot;
        round.tier2_winners = tally.silver;
        round.tier3_winners = tally.bronze;
        self.store.put_round(&round)?;

        self.store.append_event(&Event::WinningNumberRevealed {
            round_id: round_id.to_string(),
            winning_number: value,
            tier1_winners: tally.jackpot,
            tier2_winners: tally.silver,
            tier3_winners: tally.bronze,
        })?;

        info!(
            round_id,
            winning_number = value,
            tier1 = tally.jackpot,
            tier2 = tally.silver,
            tier3 = tally.bronze,
            "winning number revealed"
        );
        Ok(())
    }

    // === settlement ledger ===

    /// pay out a winning ticket. the caller attests their plaintext
    /// number and tier; the number is bound to the stored ciphertext by
    /// a confidential equality check before any funds move.
    pub fn claim_prize(
        &mut self,
        caller: AccountId,
        round_id: &str,
        declared_number: u64,
        tier_index: u8,
        _now: Timestamp,
    ) -> Result<PrizePayout> {
        let mut round = self.get_round(round_id)?;
        let mut ticket = self
            .store
            .get_ticket(round_id, &caller)?
            .ok_or(Error::TicketMissing)?;

        if round.cancelled {
            return Err(Error::RoundCancelled);
        }
        if !round.winning_number_ready {
            return Err(Error::NotSettled);
        }
        if ticket.claimed {
            return Err(Error::AlreadyClaimed);
        }

        if !self
            .coprocessor
            .verify_equals(ticket.number_handle, declared_number)?
        {
            return Err(Error::NumberMismatch);
        }

        let attested = Tier::from_index(tier_index).ok_or(Error::TierMismatch)?;
        let computed = tier::classify(round.revealed_winning_number, declared_number);
        if computed != attested {
            return Err(Error::TierMismatch);
        }
        if computed == Tier::None {
            return Err(Error::NoPrize);
        }

        let winners = round.winners_in(computed);
        let amount = tier::payout_share(round.settled_pool, computed, winners);
        round.prize_pool = round
            .prize_pool
            .checked_sub(amount)
            .ok_or_else(|| Error::Internal("prize pool underflow".into()))?;
        round.record_claim(computed);
        ticket.claimed = true;

        self.store.put_ticket(&ticket)?;
        self.store.put_round(&round)?;
        self.store.append_event(&Event::PrizeClaimed {
            round_id: round_id.to_string(),
            owner: caller,
            tier: computed.index(),
            amount,
        })?;

        info!(
            round_id,
            owner = %caller.to_hex(),
            tier = computed.index(),
            amount,
            "prize claimed"
        );
        Ok(PrizePayout {
            tier: computed,
            amount,
        })
    }

    /// terminal: no funds move at cancellation; ticket holders refund
    /// themselves lazily via [`Self::claim_refund`]
    pub fn cancel_round(&mut self, caller: AccountId, round_id: &str) -> Result<()> {
        let mut round = self.get_round(round_id)?;
        if caller != round.creator {
            return Err(Error::OnlyCreator);
        }
        if round.settled {
            return Err(Error::AlreadySettled);
        }
        if round.cancelled {
            return Err(Error::AlreadyCancelled);
        }

        round.cancelled = true;
        self.store.put_round(&round)?;
        self.store.append_event(&Event::RoundCancelled {
            round_id: round_id.to_string(),
        })?;

        info!(round_id, "round cancelled");
        Ok(())
    }

    /// return exactly the ticket price to a holder of a cancelled round
    pub fn claim_refund(&mut self, caller: AccountId, round_id: &str) -> Result<Balance> {
        let mut round = self.get_round(round_id)?;
        if !round.cancelled {
            return Err(Error::NotCancelled);
        }
        let mut ticket = self
            .store
            .get_ticket(round_id, &caller)?
            .ok_or(Error::TicketMissing)?;
        if ticket.claimed {
            return Err(Error::AlreadyClaimed);
        }

        let amount = round.ticket_price;
        round.prize_pool = round
            .prize_pool
            .checked_sub(amount)
            .ok_or_else(|| Error::Internal("refund exceeds pool".into()))?;
        ticket.claimed = true;

        self.store.put_ticket(&ticket)?;
        self.store.put_round(&round)?;
        self.store.append_event(&Event::RefundClaimed {
            round_id: round_id.to_string(),
            owner: caller,
            amount,
        })?;

        info!(round_id, owner = %caller.to_hex(), amount, "refund claimed");
        Ok(amount)
    }

    // === event log ===

    pub fn events(&self) -> Result<Vec<Event>> {
        self.store.events()
    }
}
