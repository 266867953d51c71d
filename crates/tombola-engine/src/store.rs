//! durable state: sled trees for rounds, tickets and append-only indices
//!
//! primary records are keyed by round id and (round id, owner); the
//! round-id list, per-round participant list and the event log are
//! append-only auxiliary indices.

use tracing::info;

use crate::error::{Error, Result};
use crate::events::Event;
use crate::round::Round;
use crate::ticket::Ticket;
use crate::types::{AccountId, RoundId};

pub struct Store {
    db: sled::Db,
    rounds: sled::Tree,
    tickets: sled::Tree,
    round_ids: sled::Tree,
    participants: sled::Tree,
    events: sled::Tree,
}

fn storage_err(e: sled::Error) -> Error {
    Error::Storage(e.to_string())
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| Error::Codec(e.to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(|e| Error::Codec(e.to_string()))
}

/// composite key for tickets and participant index entries. round ids
/// are length-prefixed so no id/owner pair can collide with another.
fn ticket_key(round_id: &str, owner: &AccountId) -> Vec<u8> {
    let mut key = Vec::with_capacity(4 + round_id.len() + 32);
    key.extend_from_slice(&(round_id.len() as u32).to_be_bytes());
    key.extend_from_slice(round_id.as_bytes());
    key.extend_from_slice(&owner.0);
    key
}

fn participant_prefix(round_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(4 + round_id.len());
    key.extend_from_slice(&(round_id.len() as u32).to_be_bytes());
    key.extend_from_slice(round_id.as_bytes());
    key
}

impl Store {
    pub fn open(path: &str) -> Result<Self> {
        info!("opening settlement store at {}", path);
        let db = sled::open(path).map_err(storage_err)?;
        Self::from_db(db)
    }

    /// in-memory store for tests
    pub fn open_temporary() -> Result<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(storage_err)?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self> {
        let rounds = db.open_tree("rounds").map_err(storage_err)?;
        let tickets = db.open_tree("tickets").map_err(storage_err)?;
        let round_ids = db.open_tree("round_ids").map_err(storage_err)?;
        let participants = db.open_tree("participants").map_err(storage_err)?;
        let events = db.open_tree("events").map_err(storage_err)?;
        Ok(Self {
            db,
            rounds,
            tickets,
            round_ids,
            participants,
            events,
        })
    }

    // === rounds ===

    pub fn get_round(&self, round_id: &str) -> Result<Option<Round>> {
        match self.rounds.get(round_id.as_bytes()).map_err(storage_err)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// first insert of a round; also appends to the round-id index
    pub fn insert_round(&self, round: &Round) -> Result<()> {
        self.rounds
            .insert(round.round_id.as_bytes(), encode(round)?)
            .map_err(storage_err)?;
        let seq = self.db.generate_id().map_err(storage_err)?;
        self.round_ids
            .insert(seq.to_be_bytes(), round.round_id.as_bytes())
            .map_err(storage_err)?;
        Ok(())
    }

    /// rewrite an existing round record
    pub fn put_round(&self, round: &Round) -> Result<()> {
        self.rounds
            .insert(round.round_id.as_bytes(), encode(round)?)
            .map_err(storage_err)?;
        Ok(())
    }

    /// all round ids in creation order
    pub fn round_ids(&self) -> Result<Vec<RoundId>> {
        let mut ids = Vec::new();
        for entry in self.round_ids.iter() {
            let (_, value) = entry.map_err(storage_err)?;
            let id = String::from_utf8(value.to_vec())
                .map_err(|e| Error::Codec(e.to_string()))?;
            ids.push(id);
        }
        Ok(ids)
    }

    // === tickets ===

    pub fn get_ticket(&self, round_id: &str, owner: &AccountId) -> Result<Option<Ticket>> {
        let key = ticket_key(round_id, owner);
        match self.tickets.get(key).map_err(storage_err)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// first insert of a ticket; also appends to the participant index
    pub fn insert_ticket(&self, ticket: &Ticket) -> Result<()> {
        let key = ticket_key(&ticket.round_id, &ticket.owner);
        self.tickets
            .insert(key.clone(), encode(ticket)?)
            .map_err(storage_err)?;
        self.participants
            .insert(key, Vec::new())
            .map_err(storage_err)?;
        Ok(())
    }

    /// rewrite an existing ticket record
    pub fn put_ticket(&self, ticket: &Ticket) -> Result<()> {
        let key = ticket_key(&ticket.round_id, &ticket.owner);
        self.tickets
            .insert(key, encode(ticket)?)
            .map_err(storage_err)?;
        Ok(())
    }

    /// all ticket holders of a round
    pub fn participants(&self, round_id: &str) -> Result<Vec<AccountId>> {
        let prefix = participant_prefix(round_id);
        let mut owners = Vec::new();
        for entry in self.participants.scan_prefix(&prefix) {
            let (key, _) = entry.map_err(storage_err)?;
            let raw = &key[prefix.len()..];
            let arr: [u8; 32] = raw
                .try_into()
                .map_err(|_| Error::Codec("malformed participant key".into()))?;
            owners.push(AccountId::from_raw(arr));
        }
        Ok(owners)
    }

    // === event log ===

    pub fn append_event(&self, event: &Event) -> Result<()> {
        let seq = self.db.generate_id().map_err(storage_err)?;
        self.events
            .insert(seq.to_be_bytes(), encode(event)?)
            .map_err(storage_err)?;
        Ok(())
    }

    pub fn events(&self) -> Result<Vec<Event>> {
        let mut out = Vec::new();
        for entry in self.events.iter() {
            let (_, value) = entry.map_err(storage_err)?;
            out.push(decode(&value)?);
        }
        Ok(out)
    }
}
