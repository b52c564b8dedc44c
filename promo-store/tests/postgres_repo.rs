//! Guards enforced by the Postgres statements themselves.
//!
//! Needs a disposable database: `TEST_DATABASE_URL=postgres://... cargo test`.
//! Without it every test returns early.

use chrono::{DateTime, Duration, Utc};
use promo_core::OfferRepository;
use promo_offer::{DiscountType, Offer, OfferInput, ProductDetails};
use promo_store::{DbClient, PostgresOfferRepository};
use uuid::Uuid;

async fn test_repo() -> Option<PostgresOfferRepository> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping Postgres repository test");
        return None;
    };
    let db = DbClient::new(&url, 5).await.expect("connect test database");
    db.migrate().await.expect("run migrations");
    Some(PostgresOfferRepository::new(db.pool))
}

/// Codes are unique per run so tests can share one database.
fn unique_code(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("{prefix}{suffix}")
}

fn offer(code: &str, now: DateTime<Utc>) -> Offer {
    Offer {
        id: Uuid::new_v4(),
        title: format!("{code} deal"),
        description: "Limited time".to_string(),
        discount: "10% OFF".to_string(),
        discount_type: DiscountType::Percentage,
        discount_value: 10.0,
        valid_from: now - Duration::days(1),
        valid_until: now + Duration::days(1),
        category: "Repairs".to_string(),
        promo_code: code.to_string(),
        image: None,
        is_active: true,
        redemption_steps: Vec::new(),
        product_details: ProductDetails::default(),
        max_redemptions: None,
        current_redemptions: 0,
        target_products: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn test_redeem_stops_at_cap() {
    let Some(repo) = test_repo().await else { return };
    let now = Utc::now();
    let mut capped = offer(&unique_code("CAP"), now);
    capped.max_redemptions = Some(2);
    repo.insert(&capped).await.unwrap();

    let first = repo.redeem(capped.id, now, None).await.unwrap().unwrap();
    assert_eq!(first.current_redemptions, 1);
    let second = repo.redeem(capped.id, now, None).await.unwrap().unwrap();
    assert_eq!(second.current_redemptions, 2);
    assert!(repo.redeem(capped.id, now, None).await.unwrap().is_none());

    let stored = repo.get(capped.id).await.unwrap().unwrap();
    assert_eq!(stored.current_redemptions, 2);

    repo.delete(capped.id).await.unwrap();
}

#[tokio::test]
async fn test_redeem_refuses_outside_window_and_when_inactive() {
    let Some(repo) = test_repo().await else { return };
    let now = Utc::now();

    let mut expired = offer(&unique_code("OLD"), now);
    expired.valid_from = now - Duration::days(10);
    expired.valid_until = now - Duration::days(5);
    repo.insert(&expired).await.unwrap();

    let mut upcoming = offer(&unique_code("NEXT"), now);
    upcoming.valid_from = now + Duration::days(2);
    upcoming.valid_until = now + Duration::days(5);
    repo.insert(&upcoming).await.unwrap();

    let mut paused = offer(&unique_code("OFF"), now);
    paused.is_active = false;
    repo.insert(&paused).await.unwrap();

    for id in [expired.id, upcoming.id, paused.id] {
        assert!(repo.redeem(id, now, None).await.unwrap().is_none());
        assert_eq!(repo.get(id).await.unwrap().unwrap().current_redemptions, 0);
        repo.delete(id).await.unwrap();
    }
}

#[tokio::test]
async fn test_redeem_checks_target_products() {
    let Some(repo) = test_repo().await else { return };
    let now = Utc::now();
    let eligible = Uuid::new_v4();
    let mut targeted = offer(&unique_code("PHONE"), now);
    targeted.target_products = vec![eligible];
    repo.insert(&targeted).await.unwrap();

    assert!(repo.redeem(targeted.id, now, Some(Uuid::new_v4())).await.unwrap().is_none());
    let redeemed = repo.redeem(targeted.id, now, Some(eligible)).await.unwrap().unwrap();
    assert_eq!(redeemed.current_redemptions, 1);
    let redeemed = repo.redeem(targeted.id, now, None).await.unwrap().unwrap();
    assert_eq!(redeemed.current_redemptions, 2);

    let open = offer(&unique_code("ANY"), now);
    repo.insert(&open).await.unwrap();
    assert!(repo.redeem(open.id, now, Some(Uuid::new_v4())).await.unwrap().is_some());

    repo.delete(targeted.id).await.unwrap();
    repo.delete(open.id).await.unwrap();
}

#[tokio::test]
async fn test_update_refuses_cap_below_live_counter() {
    let Some(repo) = test_repo().await else { return };
    let now = Utc::now();
    let stale = offer(&unique_code("RACE"), now);
    repo.insert(&stale).await.unwrap();

    repo.redeem(stale.id, now, None).await.unwrap().unwrap();
    repo.redeem(stale.id, now, None).await.unwrap().unwrap();

    // Validated against the snapshot taken before the redemptions landed.
    let lowered = OfferInput {
        max_redemptions: Some(Some(1)),
        ..OfferInput::default()
    }
    .merge_onto(&stale)
    .unwrap();
    assert!(repo.update(stale.id, &lowered, now).await.unwrap().is_none());

    let raised = OfferInput {
        max_redemptions: Some(Some(2)),
        ..OfferInput::default()
    }
    .merge_onto(&stale)
    .unwrap();
    let updated = repo.update(stale.id, &raised, now).await.unwrap().unwrap();
    assert_eq!(updated.max_redemptions, Some(2));
    assert_eq!(updated.current_redemptions, 2);
    assert!(repo.redeem(stale.id, now, None).await.unwrap().is_none());

    repo.delete(stale.id).await.unwrap();
}
