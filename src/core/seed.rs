//! Demo data for local development.
//!
//! Builds one user in `America/Sao_Paulo` with a card, a subscription billed on
//! that card and a few transactions, all through the regular services, then
//! issues a session so the API can be called right away. Running it again
//! keeps the existing demo user and only issues a fresh session.

use crate::{
    core::{
        card::{self, NewCard},
        cipher::CardCipher,
        identity::{self, DEFAULT_SESSION_DAYS, NewUser},
        subscription::{self, NewSubscription},
        transaction::{self, NewTransaction},
    },
    entities::{CardType, TransactionType, User, user},
    errors::Result,
};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::prelude::*;
use serde::Serialize;
use tracing::{info, instrument};

/// Login email of the demo user.
pub const DEMO_EMAIL: &str = "test@example.com";
/// Timezone of the demo user.
pub const DEMO_TIMEZONE: &str = "America/Sao_Paulo";

/// What [`seed_demo_data`] did.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedOutcome {
    /// Demo user id
    pub user_id: String,
    /// Demo user email
    pub email: String,
    /// False when the demo user already existed and was left untouched
    pub created: bool,
    /// Bearer token for the API
    pub token: String,
    /// When the token stops working
    pub expires_at: DateTime<Utc>,
}

async fn create_demo_records(
    db: &DatabaseConnection,
    cipher: &CardCipher,
    now: DateTime<Utc>,
) -> Result<user::Model> {
    let user = identity::create_user(
        db,
        NewUser {
            name: "Test User".to_string(),
            email: DEMO_EMAIL.to_string(),
            timezone: Some(DEMO_TIMEZONE.to_string()),
            currency: Some("BRL".to_string()),
        },
    )
    .await?;

    let card = card::create_card(
        db,
        cipher,
        &user.id,
        NewCard {
            name: "Everyday Card".to_string(),
            card_type: CardType::Credit,
            number: "4242 4242 4242 4242".to_string(),
            color: Some("#4f46e5".to_string()),
        },
    )
    .await?;

    let spotify_value = Decimal::new(3490, 2);
    let spotify = subscription::create_subscription(
        db,
        &user.id,
        NewSubscription {
            name: "Spotify".to_string(),
            value: spotify_value,
            billing_day: 10,
            card_id: Some(card.id.clone()),
            active: true,
        },
    )
    .await?;

    let transactions = [
        NewTransaction {
            transaction_type: TransactionType::Debit,
            value: Decimal::new(4990, 2),
            description: "Groceries".to_string(),
            category: "Food".to_string(),
            date: now,
            card_id: Some(card.id.clone()),
            subscription_id: None,
        },
        NewTransaction {
            transaction_type: TransactionType::Debit,
            value: spotify_value,
            description: "Spotify Subscription".to_string(),
            category: "Entertainment".to_string(),
            date: now,
            card_id: Some(card.id.clone()),
            subscription_id: Some(spotify.id.clone()),
        },
        NewTransaction {
            transaction_type: TransactionType::Credit,
            value: Decimal::from(1500),
            description: "Salary".to_string(),
            category: "Income".to_string(),
            date: now,
            card_id: None,
            subscription_id: None,
        },
    ];
    for input in transactions {
        transaction::create_transaction(db, &user.id, input).await?;
    }

    Ok(user)
}

/// Creates the demo user and its data if missing, then issues a session valid
/// for [`DEFAULT_SESSION_DAYS`] days.
#[instrument(skip(db, cipher))]
pub async fn seed_demo_data(
    db: &DatabaseConnection,
    cipher: &CardCipher,
    now: DateTime<Utc>,
) -> Result<SeedOutcome> {
    let existing = User::find()
        .filter(user::Column::Email.eq(DEMO_EMAIL))
        .one(db)
        .await?;

    let (user, created) = match existing {
        Some(user) => {
            info!(user_id = %user.id, "Demo user already present, issuing a new session");
            (user, false)
        }
        None => (create_demo_records(db, cipher, now).await?, true),
    };

    let session =
        identity::create_session(db, &user.id, Duration::days(DEFAULT_SESSION_DAYS)).await?;

    Ok(SeedOutcome {
        user_id: user.id,
        email: user.email,
        created,
        token: session.token,
        expires_at: session.expires_at,
    })
}
