//! End-to-end flows through the public engine surface: bid, counter,
//! settle, and the notification/event trail each step leaves behind.

use chrono::Duration;
use rust_decimal_macros::dec;

use nilami_engine::{
    types::{BuyerId, FarmerId, Principal},
    AuctionEngine, AuctionStatus, BidStatus, CounterOfferStatus, CreateAuction, EngineConfig,
    EngineEvent, MemoryStore, NotificationKind,
};

fn params(base: rust_decimal::Decimal, quantity: rust_decimal::Decimal) -> CreateAuction {
    CreateAuction {
        crop_name: "Soybean".into(),
        quantity_quintals: quantity,
        quality_grade: Some("Grade A".into()),
        base_price: base,
        minimum_bid_increment: Some(dec!(50)),
        duration: Duration::hours(48),
        location: "Latur".into(),
        district: "Latur".into(),
        state: None,
        description: "Rain-fed soybean, machine cleaned".into(),
        harvest_date: None,
        storage_location: Some("Cold storage, Latur APMC".into()),
        photos: vec![],
    }
}

fn engine() -> AuctionEngine<MemoryStore> {
    AuctionEngine::with_memory_store(EngineConfig::default())
}

/// Full negotiation round: bid 5200 over base 5000, farmer counters at
/// 5300, buyer accepts. The counter rewrites the bid in place and the
/// auction's highest bid follows it.
#[tokio::test]
async fn counter_offer_accepted_rewrites_the_bid() {
    let engine = engine();
    let farmer = Principal::Farmer(FarmerId::new());
    let buyer = Principal::Buyer(BuyerId::new());

    let auction = engine
        .create_auction(&farmer, params(dec!(5000), dec!(10)))
        .await
        .unwrap();

    let bid = engine.place_bid(auction.id, &buyer, dec!(5200)).await.unwrap();
    assert_eq!(bid.total_amount, dec!(52000));

    let counter = engine
        .send_counter_offer(auction.id, &farmer, bid.id, dec!(5300))
        .await
        .unwrap();
    assert_eq!(counter.status, CounterOfferStatus::Pending);

    // The buyer sees the counter in their pending list and in the inbox.
    let buyer_id = buyer.as_buyer().unwrap();
    let pending = engine.pending_counter_offers_for_buyer(buyer_id).await.unwrap();
    assert_eq!(pending.len(), 1);
    let inbox = engine.notifications_for(&buyer).await.unwrap();
    assert!(inbox.iter().any(|n| n.kind == NotificationKind::CounterOffer));

    let accepted = engine.accept_counter_offer(counter.id, &buyer).await.unwrap();
    assert_eq!(accepted.status, CounterOfferStatus::Accepted);

    let bid = engine.bid_by_id(bid.id).await.unwrap();
    assert_eq!(bid.price_per_quintal, dec!(5300));
    assert_eq!(bid.total_amount, dec!(53000));
    assert_eq!(bid.status, BidStatus::Active);

    let stored = engine.auction(auction.id).await.unwrap();
    assert_eq!(stored.current_highest_bid, dec!(5300));
    assert_eq!(stored.status, AuctionStatus::Active);

    // The farmer can now settle on the renegotiated price.
    let winner = engine.accept_bid(auction.id, &farmer, bid.id).await.unwrap();
    assert_eq!(winner.status, BidStatus::Accepted);
    let stored = engine.auction(auction.id).await.unwrap();
    assert_eq!(stored.status, AuctionStatus::Completed);
    assert_eq!(stored.current_highest_bid, dec!(5300));
}

/// A rejected counter leaves the ledger untouched and the bid biddable.
#[tokio::test]
async fn counter_offer_rejected_changes_nothing() {
    let engine = engine();
    let farmer = Principal::Farmer(FarmerId::new());
    let buyer = Principal::Buyer(BuyerId::new());

    let auction = engine
        .create_auction(&farmer, params(dec!(5000), dec!(10)))
        .await
        .unwrap();
    let bid = engine.place_bid(auction.id, &buyer, dec!(5200)).await.unwrap();

    let counter = engine
        .send_counter_offer(auction.id, &farmer, bid.id, dec!(5600))
        .await
        .unwrap();
    let rejected = engine.reject_counter_offer(counter.id, &buyer).await.unwrap();
    assert_eq!(rejected.status, CounterOfferStatus::Rejected);

    let bid = engine.bid_by_id(bid.id).await.unwrap();
    assert_eq!(bid.price_per_quintal, dec!(5200));
    let stored = engine.auction(auction.id).await.unwrap();
    assert_eq!(stored.current_highest_bid, dec!(5200));

    // The farmer hears about the outcome either way.
    let inbox = engine.notifications_for(&farmer).await.unwrap();
    assert!(inbox
        .iter()
        .any(|n| n.kind == NotificationKind::CounterOfferRejected));
}

/// The event bus mirrors every committed transition in order.
#[tokio::test]
async fn event_bus_carries_the_full_trail() {
    let engine = engine();
    let mut events = engine.subscribe();

    let farmer = Principal::Farmer(FarmerId::new());
    let buyer = Principal::Buyer(BuyerId::new());

    let auction = engine
        .create_auction(&farmer, params(dec!(5000), dec!(10)))
        .await
        .unwrap();
    let bid = engine.place_bid(auction.id, &buyer, dec!(5200)).await.unwrap();
    let counter = engine
        .send_counter_offer(auction.id, &farmer, bid.id, dec!(5300))
        .await
        .unwrap();
    engine.accept_counter_offer(counter.id, &buyer).await.unwrap();
    engine.accept_bid(auction.id, &farmer, bid.id).await.unwrap();

    let mut trail = Vec::new();
    while let Ok(event) = events.try_recv() {
        trail.push(event);
    }

    assert!(matches!(trail[0], EngineEvent::AuctionCreated { auction_id, .. } if auction_id == auction.id));
    assert!(matches!(trail[1], EngineEvent::BidPlaced { bid_id, .. } if bid_id == bid.id));
    assert!(matches!(
        trail[2],
        EngineEvent::CounterOfferSent { counter_offer_id, .. } if counter_offer_id == counter.id
    ));
    assert!(matches!(
        trail[3],
        EngineEvent::CounterOfferAccepted { counter_offer_id, .. } if counter_offer_id == counter.id
    ));
    assert!(matches!(trail[4], EngineEvent::BidAccepted { bid_id, .. } if bid_id == bid.id));
    assert_eq!(trail.len(), 5);
}

/// Extending an expired (lazily closed) auction re-opens bidding.
#[tokio::test]
async fn extension_reopens_an_expired_auction() {
    let engine = engine();
    let farmer = Principal::Farmer(FarmerId::new());
    let buyer = Principal::Buyer(BuyerId::new());

    let mut short = params(dec!(5000), dec!(10));
    short.duration = Duration::milliseconds(1);
    let auction = engine.create_auction(&farmer, short).await.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    let err = engine.place_bid(auction.id, &buyer, dec!(5200)).await.unwrap_err();
    assert_eq!(err, nilami_engine::EngineError::AuctionClosed);

    engine
        .extend_auction(auction.id, &farmer, Duration::hours(1))
        .await
        .unwrap();

    let bid = engine.place_bid(auction.id, &buyer, dec!(5200)).await.unwrap();
    assert_eq!(bid.status, BidStatus::Active);
}
