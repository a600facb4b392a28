//! Subscription entity - A recurring monthly charge definition.
//!
//! Active subscriptions are picked up by the billing job, which emits one
//! DEBIT transaction per local calendar month on (or after) `billing_day`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Subscription database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subscriptions")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Owner of the subscription
    pub user_id: String,
    /// Name of the service (e.g., "Spotify")
    pub name: String,
    /// Monthly charge, always positive
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub value: Decimal,
    /// Day of month the charge is due, 1-31
    pub billing_day: i32,
    /// Inactive subscriptions are ignored by the billing job
    pub active: bool,
    /// Optional card the charge is made on
    pub card_id: Option<String>,
    /// When the subscription was created
    pub created_at: DateTimeUtc,
    /// When the subscription was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Subscription and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each subscription belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// Each subscription may be charged on one card
    #[sea_orm(
        belongs_to = "super::card::Entity",
        from = "Column::CardId",
        to = "super::card::Column::Id"
    )]
    Card,
    /// One subscription generates many transactions
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::card::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Card.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
