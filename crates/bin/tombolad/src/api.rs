//! http json surface for the settlement engine
//!
//! thin translation layer: parse the request, take the engine lock, call
//! the one matching engine operation, map the typed error to a status
//! code. caller identity is a hex account id supplied by the wallet
//! layer; currency amounts travel as decimal strings so u128 precision
//! survives clients that parse json numbers as doubles.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use tombola_engine::{
    AccountId, Balance, Error, Event, LocalCoprocessor, Round, RoundStatus, SettlementEngine,
    Ticket, Timestamp, ValueHandle,
};

pub type SharedEngine = Arc<RwLock<SettlementEngine<LocalCoprocessor>>>;

pub fn router(engine: SharedEngine) -> Router {
    Router::new()
        .route("/rounds", post(create_round).get(list_rounds))
        .route("/rounds/{id}", get(get_round))
        .route("/rounds/{id}/status", get(round_status))
        .route("/rounds/{id}/tickets", post(purchase_ticket))
        .route("/rounds/{id}/tickets/{owner}", get(get_ticket))
        .route("/rounds/{id}/draw", post(request_winning_number))
        .route("/rounds/{id}/claims", post(claim_prize))
        .route("/rounds/{id}/refunds", post(claim_refund))
        .route("/rounds/{id}/cancel", post(cancel_round))
        .route("/oracle/decrypted", post(oracle_decrypted))
        .route("/events", get(events))
        .route("/health", get(health))
        .with_state(engine)
}

fn now() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// === error mapping ===

enum ApiError {
    /// engine rejected the operation
    Engine(Error),
    /// request was not even parseable
    BadRequest(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::Engine(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            ApiError::BadRequest(message) => {
                let body = Json(ErrorResponse {
                    error: "BadRequest",
                    message,
                });
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            ApiError::Engine(err) => err,
        };
        let status = match &err {
            Error::RoundMissing | Error::TicketMissing => StatusCode::NOT_FOUND,
            Error::InvalidPrice
            | Error::InvalidDuration
            | Error::WrongTicketPrice
            | Error::InvalidCiphertext
            | Error::NumberMismatch
            | Error::TierMismatch
            | Error::NoPrize => StatusCode::BAD_REQUEST,
            Error::OnlyCreator => StatusCode::FORBIDDEN,
            Error::RoundExists
            | Error::RoundNotActive
            | Error::RoundActive
            | Error::AlreadyPurchased
            | Error::DecryptPending
            | Error::AlreadyRevealed
            | Error::AlreadyClaimed
            | Error::AlreadyCancelled
            | Error::AlreadySettled
            | Error::NotSettled
            | Error::NotCancelled
            | Error::RoundCancelled
            | Error::UnexpectedCallback
            | Error::WinningNumberOutOfRange(_) => StatusCode::CONFLICT,
            Error::Storage(_) | Error::Codec(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(ErrorResponse {
            error: err.kind(),
            message: err.to_string(),
        });
        (status, body).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

fn parse_account(s: &str) -> Result<AccountId, ApiError> {
    AccountId::from_hex(s).ok_or_else(|| ApiError::BadRequest("invalid account id".into()))
}

fn parse_hex(s: &str, what: &str) -> Result<Vec<u8>, ApiError> {
    hex::decode(s).map_err(|_| ApiError::BadRequest(format!("invalid hex {what}")))
}

/// balances cross the wire as decimal strings; a wei-scale u128 pool
/// does not fit a double and would be mangled as a json number
mod balance_str {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use tombola_engine::Balance;

    pub fn serialize<S: Serializer>(v: &Balance, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&v.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Balance, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse()
            .map_err(|_| de::Error::custom("invalid decimal balance"))
    }
}

// === request / response types ===

#[derive(Deserialize)]
pub struct CreateRoundRequest {
    caller: AccountId,
    round_id: String,
    #[serde(with = "balance_str")]
    ticket_price: Balance,
    duration: u64,
}

#[derive(Serialize)]
pub struct RoundResponse {
    round_id: String,
    creator: AccountId,
    #[serde(with = "balance_str")]
    ticket_price: Balance,
    start_time: Timestamp,
    end_time: Timestamp,
    #[serde(with = "balance_str")]
    prize_pool: Balance,
    ticket_count: u64,
    cancelled: bool,
    settled: bool,
    decryption_requested: bool,
    winning_number_ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    revealed_winning_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    winning_number_handle: Option<ValueHandle>,
    tier1_winners: u64,
    tier2_winners: u64,
    tier3_winners: u64,
    tier1_claimed: u64,
    tier2_claimed: u64,
    tier3_claimed: u64,
}

impl From<Round> for RoundResponse {
    fn from(r: Round) -> Self {
        Self {
            round_id: r.round_id.clone(),
            creator: r.creator,
            ticket_price: r.ticket_price,
            start_time: r.start_time,
            end_time: r.end_time,
            prize_pool: r.prize_pool,
            ticket_count: r.ticket_count,
            cancelled: r.cancelled,
            settled: r.settled,
            decryption_requested: r.decryption_requested,
            winning_number_ready: r.winning_number_ready,
            revealed_winning_number: r
                .winning_number_ready
                .then_some(r.revealed_winning_number),
            winning_number_handle: r.winning_number_handle,
            tier1_winners: r.tier1_winners,
            tier2_winners: r.tier2_winners,
            tier3_winners: r.tier3_winners,
            tier1_claimed: r.tier1_claimed,
            tier2_claimed: r.tier2_claimed,
            tier3_claimed: r.tier3_claimed,
        }
    }
}

#[derive(Serialize)]
pub struct TicketResponse {
    round_id: String,
    owner: AccountId,
    purchase_time: Timestamp,
    number_handle: ValueHandle,
    claimed: bool,
}

impl From<Ticket> for TicketResponse {
    fn from(t: Ticket) -> Self {
        Self {
            round_id: t.round_id,
            owner: t.owner,
            purchase_time: t.purchase_time,
            number_handle: t.number_handle,
            claimed: t.claimed,
        }
    }
}

#[derive(Deserialize)]
pub struct PurchaseRequest {
    caller: AccountId,
    /// hex ciphertext of the chosen number
    ciphertext: String,
    /// hex proof of well-formed plaintext
    proof: String,
    #[serde(with = "balance_str")]
    payment: Balance,
}

#[derive(Deserialize)]
pub struct CallerOnly {
    caller: AccountId,
}

#[derive(Deserialize)]
pub struct ClaimRequest {
    caller: AccountId,
    declared_number: u64,
    tier: u8,
}

#[derive(Serialize)]
pub struct ClaimResponse {
    tier: u8,
    #[serde(with = "balance_str")]
    amount: Balance,
}

#[derive(Serialize)]
pub struct RefundResponse {
    #[serde(with = "balance_str")]
    amount: Balance,
}

#[derive(Deserialize)]
pub struct OracleCallback {
    round_id: String,
    value: u64,
}

#[derive(Serialize)]
pub struct StatusResponse {
    status: RoundStatus,
}

// === handlers ===

async fn create_round(
    State(engine): State<SharedEngine>,
    Json(req): Json<CreateRoundRequest>,
) -> Result<Json<RoundResponse>, ApiError> {
    let mut engine = engine.write().await;
    let round = engine.create_round(
        req.caller,
        &req.round_id,
        req.ticket_price,
        req.duration,
        now(),
    )?;
    Ok(Json(round.into()))
}

async fn list_rounds(
    State(engine): State<SharedEngine>,
) -> Result<Json<Vec<String>>, ApiError> {
    let engine = engine.read().await;
    Ok(Json(engine.list_round_ids()?))
}

async fn get_round(
    State(engine): State<SharedEngine>,
    Path(id): Path<String>,
) -> Result<Json<RoundResponse>, ApiError> {
    let engine = engine.read().await;
    Ok(Json(engine.get_round(&id)?.into()))
}

async fn round_status(
    State(engine): State<SharedEngine>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let engine = engine.read().await;
    let status = engine.round_status(&id, now())?;
    Ok(Json(StatusResponse { status }))
}

async fn purchase_ticket(
    State(engine): State<SharedEngine>,
    Path(id): Path<String>,
    Json(req): Json<PurchaseRequest>,
) -> Result<Json<TicketResponse>, ApiError> {
    let ciphertext = parse_hex(&req.ciphertext, "ciphertext")?;
    let proof = parse_hex(&req.proof, "proof")?;
    let mut engine = engine.write().await;
    let ticket =
        engine.purchase_ticket(req.caller, &id, &ciphertext, &proof, req.payment, now())?;
    Ok(Json(ticket.into()))
}

async fn get_ticket(
    State(engine): State<SharedEngine>,
    Path((id, owner)): Path<(String, String)>,
) -> Result<Json<TicketResponse>, ApiError> {
    let owner = parse_account(&owner)?;
    let engine = engine.read().await;
    Ok(Json(engine.get_ticket(&id, &owner)?.into()))
}

async fn request_winning_number(
    State(engine): State<SharedEngine>,
    Path(id): Path<String>,
    Json(req): Json<CallerOnly>,
) -> Result<StatusCode, ApiError> {
    let mut engine = engine.write().await;
    engine.request_winning_number(req.caller, &id, now())?;
    Ok(StatusCode::ACCEPTED)
}

async fn claim_prize(
    State(engine): State<SharedEngine>,
    Path(id): Path<String>,
    Json(req): Json<ClaimRequest>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let mut engine = engine.write().await;
    let payout = engine.claim_prize(req.caller, &id, req.declared_number, req.tier, now())?;
    Ok(Json(ClaimResponse {
        tier: payout.tier.index(),
        amount: payout.amount,
    }))
}

async fn claim_refund(
    State(engine): State<SharedEngine>,
    Path(id): Path<String>,
    Json(req): Json<CallerOnly>,
) -> Result<Json<RefundResponse>, ApiError> {
    let mut engine = engine.write().await;
    let amount = engine.claim_refund(req.caller, &id)?;
    Ok(Json(RefundResponse { amount }))
}

async fn cancel_round(
    State(engine): State<SharedEngine>,
    Path(id): Path<String>,
    Json(req): Json<CallerOnly>,
) -> Result<StatusCode, ApiError> {
    let mut engine = engine.write().await;
    engine.cancel_round(req.caller, &id)?;
    Ok(StatusCode::OK)
}

/// external oracle boundary: single-shot decryption callback
async fn oracle_decrypted(
    State(engine): State<SharedEngine>,
    Json(req): Json<OracleCallback>,
) -> Result<StatusCode, ApiError> {
    let mut engine = engine.write().await;
    engine.on_winning_number_decrypted(&req.round_id, req.value)?;
    Ok(StatusCode::OK)
}

async fn events(State(engine): State<SharedEngine>) -> Result<Json<Vec<Event>>, ApiError> {
    let engine = engine.read().await;
    Ok(Json(engine.events()?))
}

async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balances_cross_the_wire_as_decimal_strings() {
        let mut round = Round::new(
            "R1",
            AccountId::from_raw([1u8; 32]),
            1_000_000_000_000_000_000,
            100,
            600,
        );
        // beyond 2^53, where json doubles lose integer precision
        round.prize_pool = 5_000_000_000_000_000_000;

        let json = serde_json::to_value(RoundResponse::from(round)).unwrap();
        assert_eq!(json["ticket_price"], "1000000000000000000");
        assert_eq!(json["prize_pool"], "5000000000000000000");
    }

    #[test]
    fn test_create_request_parses_string_price() {
        let req: CreateRoundRequest = serde_json::from_str(
            r#"{
                "caller": "0101010101010101010101010101010101010101010101010101010101010101",
                "round_id": "R1",
                "ticket_price": "340282366920938463463374607431768211455",
                "duration": 600
            }"#,
        )
        .unwrap();
        assert_eq!(req.ticket_price, Balance::MAX);

        // a bare json number is rejected, not silently coerced
        assert!(serde_json::from_str::<CreateRoundRequest>(
            r#"{
                "caller": "0101010101010101010101010101010101010101010101010101010101010101",
                "round_id": "R1",
                "ticket_price": 1000,
                "duration": 600
            }"#,
        )
        .is_err());
    }
}
