//! Card entity - A logical payment card owned by a user.
//!
//! The full card number is only ever stored encrypted (`encrypted_number`);
//! `last_digits` is the plaintext suffix shown back to the user. Neither
//! changes after creation.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of card
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardType {
    /// Regular credit card
    #[sea_orm(string_value = "CREDIT")]
    Credit,
    /// Card dedicated to recurring subscriptions
    #[sea_orm(string_value = "SUBSCRIPTION")]
    Subscription,
}

/// Card database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cards")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Owner of the card
    pub user_id: String,
    /// Human-readable label (e.g., "Everyday Card")
    pub name: String,
    /// `CREDIT` or `SUBSCRIPTION`
    pub card_type: CardType,
    /// `nonce:ciphertext:tag`, each part base64 encoded
    pub encrypted_number: String,
    /// Plaintext last four digits
    pub last_digits: String,
    /// Optional display color (e.g., `"#4f46e5"`)
    pub color: Option<String>,
    /// When the card was created
    pub created_at: DateTimeUtc,
    /// When the card was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Card and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each card belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// One card may fund many subscriptions
    #[sea_orm(has_many = "super::subscription::Entity")]
    Subscriptions,
    /// One card may be used by many transactions
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::subscription::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subscriptions.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
