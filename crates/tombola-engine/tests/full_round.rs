//! end-to-end round lifecycle against a real on-disk store

use tombola_engine::{
    AccountId, Balance, Event, LocalCoprocessor, RoundStatus, SettlementEngine, Store, Tier,
};

const PRICE: Balance = 1_000;
const DURATION: u64 = 600;
const T0: u64 = 1_700_000_000;

fn acct(n: u8) -> AccountId {
    AccountId::from_raw([n; 32])
}

#[test]
fn full_round_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db");
    let path = path.to_str().unwrap();
    let creator = acct(0xc0);

    // phase 1: create and sell, then stop the engine
    {
        let store = Store::open(path).unwrap();
        let mut engine = SettlementEngine::new(store, LocalCoprocessor::with_seed(1));
        engine
            .create_round(creator, "R1", PRICE, DURATION, T0)
            .unwrap();
        for (n, number) in [(1u8, 50u64), (2, 48), (3, 42), (4, 10)] {
            let who = acct(n);
            let (ct, proof) = LocalCoprocessor::encrypt(number, who);
            engine
                .purchase_ticket(who, "R1", &ct, &proof, PRICE, T0 + 10)
                .unwrap();
        }
    }

    // phase 2: reopen, reveal and settle
    let store = Store::open(path).unwrap();
    let mut engine = SettlementEngine::new(store, LocalCoprocessor::with_seed(1));

    let round = engine.get_round("R1").unwrap();
    assert_eq!(round.ticket_count, 4);
    assert_eq!(round.prize_pool, 4 * PRICE);
    assert_eq!(
        engine.round_status("R1", T0 + DURATION).unwrap(),
        RoundStatus::Ended
    );

    engine
        .request_winning_number(creator, "R1", T0 + DURATION)
        .unwrap();

    // the store survived the restart but the in-memory dev co-processor
    // did not: the tally fails, the callback is rejected and the round
    // stays pending instead of settling on bad data
    let pending = engine.coprocessor_mut().take_pending();
    assert_eq!(pending.len(), 1);
    assert!(engine.on_winning_number_decrypted("R1", 50).is_err());
    assert!(!engine.get_round("R1").unwrap().winning_number_ready);

    // phase 3: fresh round on the same store settles end to end
    let creator2 = acct(0xc1);
    engine
        .create_round(creator2, "R2", PRICE, DURATION, T0)
        .unwrap();
    for (n, number) in [(1u8, 50u64), (2, 48), (3, 42), (4, 10)] {
        let who = acct(n);
        let (ct, proof) = LocalCoprocessor::encrypt(number, who);
        engine
            .purchase_ticket(who, "R2", &ct, &proof, PRICE, T0 + 10)
            .unwrap();
    }
    engine
        .request_winning_number(creator2, "R2", T0 + DURATION)
        .unwrap();
    engine.on_winning_number_decrypted("R2", 50).unwrap();

    let pool = 4 * PRICE;
    let p1 = engine.claim_prize(acct(1), "R2", 50, 1, T0 + DURATION + 1).unwrap();
    let p2 = engine.claim_prize(acct(2), "R2", 48, 2, T0 + DURATION + 1).unwrap();
    let p3 = engine.claim_prize(acct(3), "R2", 42, 3, T0 + DURATION + 1).unwrap();
    assert_eq!(p1.tier, Tier::Jackpot);
    assert_eq!(p1.amount, pool / 2);
    assert_eq!(p2.amount, pool * 30 / 100);
    assert_eq!(p3.amount, pool * 20 / 100);

    // every mutation left a trail for indexers
    let events = engine.events().unwrap();
    let kinds: Vec<&str> = events
        .iter()
        .map(|e| match e {
            Event::RoundCreated { .. } => "created",
            Event::TicketPurchased { .. } => "purchased",
            Event::WinningNumberRequested { .. } => "requested",
            Event::WinningNumberRevealed { .. } => "revealed",
            Event::PrizeClaimed { .. } => "claimed",
            Event::RefundClaimed { .. } => "refunded",
            Event::RoundCancelled { .. } => "cancelled",
        })
        .collect();
    assert!(kinds.contains(&"created"));
    assert!(kinds.contains(&"revealed"));
    assert_eq!(kinds.iter().filter(|k| **k == "claimed").count(), 3);

    assert_eq!(engine.list_round_ids().unwrap(), vec!["R1", "R2"]);
}

#[test]
fn cancelled_round_refunds_everyone_exactly_once() {
    let store = Store::open_temporary().unwrap();
    let mut engine = SettlementEngine::new(store, LocalCoprocessor::with_seed(2));
    let creator = acct(0xc0);

    engine
        .create_round(creator, "R1", PRICE, DURATION, T0)
        .unwrap();
    for n in 1u8..=3 {
        let who = acct(n);
        let (ct, proof) = LocalCoprocessor::encrypt(n as u64 * 10, who);
        engine
            .purchase_ticket(who, "R1", &ct, &proof, PRICE, T0 + 1)
            .unwrap();
    }
    engine.cancel_round(creator, "R1").unwrap();

    let mut refunded: Balance = 0;
    for n in 1u8..=3 {
        refunded += engine.claim_refund(acct(n), "R1").unwrap();
    }
    assert_eq!(refunded, 3 * PRICE);
    assert_eq!(engine.get_round("R1").unwrap().prize_pool, 0);

    for n in 1u8..=3 {
        assert!(engine.claim_refund(acct(n), "R1").is_err());
    }
}
