//! Shared test utilities for pocket-ledger.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults. Fixtures are inserted
//! directly through the entities so tests can build states the services would
//! refuse (e.g. a user with an unknown timezone).

#![allow(clippy::panic)]

use crate::{
    core::cipher::CardCipher,
    entities::{CardType, TransactionType, card, subscription, transaction, user},
    errors::Result,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

/// Key used by every test cipher.
pub const TEST_KEY: &str = "0123456789abcdef0123456789abcdef";

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Installs a tracing subscriber that writes through the test harness.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("pocket_ledger=debug")
        .with_test_writer()
        .try_init();
}

/// A cipher built from [`TEST_KEY`].
pub fn test_cipher() -> CardCipher {
    CardCipher::from_secret(Some(TEST_KEY)).unwrap_or_else(|e| panic!("test key rejected: {e}"))
}

fn parse_instant(raw: &str) -> DateTime<Utc> {
    raw.parse()
        .unwrap_or_else(|e| panic!("bad test timestamp {raw}: {e}"))
}

/// Creates a test user in UTC.
///
/// # Defaults
/// * `name`: `"Test User"`
/// * `currency`: `"BRL"`
pub async fn create_test_user(db: &DatabaseConnection, email: &str) -> Result<user::Model> {
    create_test_user_in(db, email, "UTC").await
}

/// Creates a test user with a specific timezone string. The timezone is not validated.
pub async fn create_test_user_in(
    db: &DatabaseConnection,
    email: &str,
    timezone: &str,
) -> Result<user::Model> {
    let now = Utc::now();
    user::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        name: Set("Test User".to_string()),
        email: Set(email.to_string()),
        timezone: Set(timezone.to_string()),
        currency: Set("BRL".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Sets up a complete test environment with one user.
/// Returns (db, user) for common test scenarios.
pub async fn setup_with_user() -> Result<(DatabaseConnection, user::Model)> {
    let db = setup_test_db().await?;
    let user = create_test_user(&db, "test@example.com").await?;
    Ok((db, user))
}

/// Creates a test card for `user_id`.
///
/// # Defaults
/// * `name`: `"Test Card"`
/// * `type`: `CREDIT`
/// * `last_digits`: `"1234"`
pub async fn create_test_card(db: &DatabaseConnection, user_id: &str) -> Result<card::Model> {
    let now = Utc::now();
    card::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(user_id.to_string()),
        name: Set("Test Card".to_string()),
        card_type: Set(CardType::Credit),
        encrypted_number: Set(test_cipher().encrypt("4111111111111234")?),
        last_digits: Set("1234".to_string()),
        color: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Creates an active test subscription for `user_id`.
///
/// # Defaults
/// * `name`: `"Test Subscription"`
/// * `value`: 50
/// * `card_id`: None
pub async fn create_test_subscription(
    db: &DatabaseConnection,
    user_id: &str,
    billing_day: i32,
) -> Result<subscription::Model> {
    let now = Utc::now();
    subscription::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(user_id.to_string()),
        name: Set("Test Subscription".to_string()),
        value: Set(Decimal::from(50)),
        billing_day: Set(billing_day),
        active: Set(true),
        card_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

async fn update_subscription_row(
    db: &DatabaseConnection,
    id: &str,
    change: impl FnOnce(&mut subscription::ActiveModel),
) -> Result<subscription::Model> {
    let existing = subscription::Entity::find_by_id(id.to_string())
        .one(db)
        .await?
        .unwrap_or_else(|| panic!("subscription {id} missing"));
    let mut active: subscription::ActiveModel = existing.into();
    change(&mut active);
    active.update(db).await.map_err(Into::into)
}

/// Pauses or resumes a subscription.
pub async fn set_subscription_active(
    db: &DatabaseConnection,
    id: &str,
    active: bool,
) -> Result<subscription::Model> {
    update_subscription_row(db, id, |s| s.active = Set(active)).await
}

/// Attaches a card to a subscription.
pub async fn set_subscription_card(
    db: &DatabaseConnection,
    id: &str,
    card_id: &str,
) -> Result<subscription::Model> {
    update_subscription_row(db, id, |s| s.card_id = Set(Some(card_id.to_string()))).await
}

async fn insert_transaction(
    db: &DatabaseConnection,
    user_id: &str,
    subscription_id: Option<&str>,
    date: &str,
    created_at: &str,
) -> Result<transaction::Model> {
    let created_at = parse_instant(created_at);
    transaction::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(user_id.to_string()),
        transaction_type: Set(TransactionType::Debit),
        value: Set(Decimal::from(10)),
        description: Set("Test transaction".to_string()),
        category: Set("Test".to_string()),
        date: Set(parse_instant(date)),
        card_id: Set(None),
        subscription_id: Set(subscription_id.map(str::to_string)),
        created_at: Set(created_at),
        updated_at: Set(created_at),
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Inserts a DEBIT of 10 with explicit `date` and `created_at` timestamps.
pub async fn insert_transaction_at(
    db: &DatabaseConnection,
    user_id: &str,
    date: &str,
    created_at: &str,
) -> Result<transaction::Model> {
    insert_transaction(db, user_id, None, date, created_at).await
}

/// Inserts a DEBIT of 10 linked to `subscription_id`, as if entered by hand.
pub async fn insert_transaction_for_subscription(
    db: &DatabaseConnection,
    user_id: &str,
    subscription_id: &str,
    date: &str,
) -> Result<transaction::Model> {
    insert_transaction(db, user_id, Some(subscription_id), date, date).await
}
