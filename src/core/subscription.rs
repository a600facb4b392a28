//! Subscription business logic
//!
//! Create, update and list recurring subscription definitions. The charges
//! themselves are produced by [`crate::core::billing`].

use crate::{
    core::{
        ownership::{RelationRefs, assert_ownership},
        validation::{RelationPatch, Validator, empty_patch},
    },
    entities::{Subscription, subscription},
    errors::{EntityKind, Error, Result},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

/// Longest accepted subscription name, in characters.
pub const MAX_NAME_LEN: usize = 120;
const MIN_BILLING_DAY: i32 = 1;
const MAX_BILLING_DAY: i32 = 31;

const fn default_active() -> bool {
    true
}

/// Input for [`create_subscription`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubscription {
    /// 1-120 characters after trimming
    pub name: String,
    /// Positive monthly charge
    pub value: Decimal,
    /// Day of month the charge is due, 1-31
    pub billing_day: i32,
    /// Card the charge is made on
    #[serde(default)]
    pub card_id: Option<String>,
    /// Defaults to true
    #[serde(default = "default_active")]
    pub active: bool,
}

impl NewSubscription {
    /// Trims the name and checks every constraint.
    pub fn validate(self) -> Result<Self> {
        let mut v = Validator::new();
        let name = v.text("name", &self.name, 1, MAX_NAME_LEN);
        v.positive("value", self.value);
        v.in_range("billingDay", self.billing_day, MIN_BILLING_DAY, MAX_BILLING_DAY);
        let card_id = v.relation("cardId", self.card_id);
        v.finish(Self {
            name,
            card_id,
            ..self
        })
    }
}

/// Partial update for [`update_subscription`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPatch {
    /// New name
    pub name: Option<String>,
    /// New monthly charge
    pub value: Option<Decimal>,
    /// New billing day
    pub billing_day: Option<i32>,
    /// Card reference change; `null` detaches the card
    #[serde(default)]
    pub card_id: RelationPatch,
    /// Pause or resume billing
    pub active: Option<bool>,
}

impl SubscriptionPatch {
    /// True when no field would change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.value.is_none()
            && self.billing_day.is_none()
            && self.card_id.is_unset()
            && self.active.is_none()
    }

    /// Rejects empty patches and checks the fields that are present.
    pub fn validate(self) -> Result<Self> {
        if self.is_empty() {
            return Err(empty_patch());
        }
        let mut v = Validator::new();
        let name = self.name.map(|n| v.text("name", &n, 1, MAX_NAME_LEN));
        if let Some(value) = self.value {
            v.positive("value", value);
        }
        if let Some(day) = self.billing_day {
            v.in_range("billingDay", day, MIN_BILLING_DAY, MAX_BILLING_DAY);
        }
        let card_id = v.relation_patch("cardId", self.card_id);
        v.finish(Self {
            name,
            card_id,
            ..self
        })
    }
}

/// Externally visible projection of a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDto {
    /// Identifier
    pub id: String,
    /// Service name
    pub name: String,
    /// Monthly charge
    pub value: Decimal,
    /// Due day of month
    pub billing_day: i32,
    /// Whether the billing job picks it up
    pub active: bool,
    /// Card the charge is made on
    pub card_id: Option<String>,
    /// Creation instant
    pub created_at: DateTime<Utc>,
    /// Last modification instant
    pub updated_at: DateTime<Utc>,
}

impl From<subscription::Model> for SubscriptionDto {
    fn from(model: subscription::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            value: model.value,
            billing_day: model.billing_day,
            active: model.active,
            card_id: model.card_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Lists a user's subscriptions, newest first.
#[instrument(skip(db))]
pub async fn list_subscriptions(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<SubscriptionDto>> {
    let subscriptions = Subscription::find()
        .filter(subscription::Column::UserId.eq(user_id))
        .order_by_desc(subscription::Column::CreatedAt)
        .all(db)
        .await?;

    Ok(subscriptions.into_iter().map(Into::into).collect())
}

/// Creates a subscription for `user_id`.
///
/// # Errors
/// - [`Error::Validation`] for invalid input
/// - [`Error::ForeignRelationInvalid`] when `cardId` is not one of the user's cards
pub async fn create_subscription(
    db: &DatabaseConnection,
    user_id: &str,
    input: NewSubscription,
) -> Result<SubscriptionDto> {
    let input = input.validate()?;

    assert_ownership(
        db,
        user_id,
        RelationRefs {
            card_id: input.card_id.as_deref(),
            ..Default::default()
        },
    )
    .await?;

    let now = Utc::now();
    let created = subscription::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(user_id.to_string()),
        name: Set(input.name),
        value: Set(input.value),
        billing_day: Set(input.billing_day),
        active: Set(input.active),
        card_id: Set(input.card_id),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    info!(subscription_id = %created.id, billing_day = created.billing_day, "Created subscription");
    Ok(created.into())
}

/// Applies `patch` to a subscription owned by `user_id`.
///
/// # Errors
/// - [`Error::NotFound`] / [`Error::Forbidden`] for missing or foreign subscriptions
/// - [`Error::Validation`] for an empty or invalid patch
/// - [`Error::ForeignRelationInvalid`] when the new `cardId` is not the user's
pub async fn update_subscription(
    db: &DatabaseConnection,
    user_id: &str,
    id: &str,
    patch: SubscriptionPatch,
) -> Result<SubscriptionDto> {
    let txn = db.begin().await?;

    let existing = Subscription::find_by_id(id.to_string())
        .one(&txn)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: EntityKind::Subscription,
            id: id.to_string(),
        })?;
    if existing.user_id != user_id {
        return Err(Error::Forbidden {
            message: "Subscription does not belong to the user".to_string(),
        });
    }

    let patch = patch.validate()?;
    assert_ownership(
        &txn,
        user_id,
        RelationRefs {
            card_id: patch.card_id.as_set(),
            ..Default::default()
        },
    )
    .await?;

    let card_id = patch.card_id.apply(existing.card_id.clone());
    let mut active: subscription::ActiveModel = existing.into();
    if let Some(name) = patch.name {
        active.name = Set(name);
    }
    if let Some(value) = patch.value {
        active.value = Set(value);
    }
    if let Some(day) = patch.billing_day {
        active.billing_day = Set(day);
    }
    if let Some(flag) = patch.active {
        active.active = Set(flag);
    }
    active.card_id = Set(card_id);
    active.updated_at = Set(Utc::now());

    let updated = active.update(&txn).await?;
    txn.commit().await?;

    info!(subscription_id = %updated.id, active = updated.active, "Updated subscription");
    Ok(updated.into())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use crate::test_utils::*;
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn new_subscription(name: &str, billing_day: i32) -> NewSubscription {
        NewSubscription {
            name: name.to_string(),
            value: dec!(29.90),
            billing_day,
            card_id: None,
            active: true,
        }
    }

    #[test]
    fn test_active_defaults_to_true() {
        let input: NewSubscription =
            serde_json::from_str(r#"{"name": "Spotify", "value": "21.90", "billingDay": 5}"#)
                .unwrap();
        assert!(input.active);
        assert_eq!(input.card_id, None);
    }

    #[tokio::test]
    async fn test_create_subscription_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let mut input = new_subscription("", 32);
        input.value = dec!(0);
        match create_subscription(&db, "user-1", input).await.unwrap_err() {
            Error::Validation { issues, .. } => {
                let fields: Vec<_> = issues.iter().map(|i| i.field.as_str()).collect();
                assert_eq!(fields, vec!["name", "value", "billingDay"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let result = create_subscription(&db, "user-1", new_subscription("Gym", 0)).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_and_list_subscriptions() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let other = create_test_user(&db, "other@example.com").await?;
        let card = create_test_card(&db, &user.id).await?;

        let first = create_subscription(&db, &user.id, new_subscription("  Netflix  ", 10)).await?;
        assert_eq!(first.name, "Netflix");
        assert!(first.active);
        std::thread::sleep(std::time::Duration::from_millis(5));

        let mut with_card = new_subscription("Spotify", 31);
        with_card.card_id = Some(card.id.clone());
        let second = create_subscription(&db, &user.id, with_card).await?;
        assert_eq!(second.card_id, Some(card.id));

        create_subscription(&db, &other.id, new_subscription("Elsewhere", 1)).await?;

        let listed = list_subscriptions(&db, &user.id).await?;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_subscription_rejects_foreign_card() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let other = create_test_user(&db, "other@example.com").await?;
        let foreign_card = create_test_card(&db, &other.id).await?;

        let mut input = new_subscription("Netflix", 10);
        input.card_id = Some(foreign_card.id);
        let result = create_subscription(&db, &user.id, input).await;
        assert!(matches!(
            result,
            Err(Error::ForeignRelationInvalid { field: "cardId" })
        ));
        assert!(list_subscriptions(&db, &user.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_update_subscription_fields_and_card_clear() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let card = create_test_card(&db, &user.id).await?;
        let mut input = new_subscription("Netflix", 10);
        input.card_id = Some(card.id.clone());
        let created = create_subscription(&db, &user.id, input).await?;

        let patch = SubscriptionPatch {
            value: Some(dec!(39.90)),
            active: Some(false),
            ..Default::default()
        };
        let updated = update_subscription(&db, &user.id, &created.id, patch).await?;
        assert_eq!(updated.value, dec!(39.90));
        assert!(!updated.active);
        assert_eq!(updated.card_id, Some(card.id));
        assert_eq!(updated.name, "Netflix");

        let patch: SubscriptionPatch = serde_json::from_str(r#"{"cardId": null}"#).unwrap();
        let updated = update_subscription(&db, &user.id, &created.id, patch).await?;
        assert_eq!(updated.card_id, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_subscription_errors() -> Result<()> {
        let (db, owner) = setup_with_user().await?;
        let intruder = create_test_user(&db, "intruder@example.com").await?;
        let foreign_card = create_test_card(&db, &intruder.id).await?;
        let created = create_subscription(&db, &owner.id, new_subscription("Netflix", 10)).await?;

        let result =
            update_subscription(&db, &owner.id, "missing", SubscriptionPatch::default()).await;
        assert!(matches!(
            result,
            Err(Error::NotFound {
                entity: EntityKind::Subscription,
                ..
            })
        ));

        let result =
            update_subscription(&db, &intruder.id, &created.id, SubscriptionPatch::default()).await;
        assert!(matches!(result, Err(Error::Forbidden { .. })));

        let result =
            update_subscription(&db, &owner.id, &created.id, SubscriptionPatch::default()).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let patch = SubscriptionPatch {
            card_id: RelationPatch::Set(foreign_card.id),
            ..Default::default()
        };
        let result = update_subscription(&db, &owner.id, &created.id, patch).await;
        assert!(matches!(
            result,
            Err(Error::ForeignRelationInvalid { field: "cardId" })
        ));

        let patch = SubscriptionPatch {
            billing_day: Some(40),
            ..Default::default()
        };
        let result = update_subscription(&db, &owner.id, &created.id, patch).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }
}
