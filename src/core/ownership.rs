//! Ownership checks for cross-entity references.
//!
//! Before a transaction or subscription is written with a `cardId` or
//! `subscriptionId`, the referenced row must exist and belong to the acting
//! user. Anything else is a `FOREIGN_RELATION_INVALID` failure naming the field.

use crate::{
    entities::{Card, Subscription},
    errors::{Error, Result},
};
use sea_orm::{ConnectionTrait, EntityTrait};

/// References carried by an input that must be owned by the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelationRefs<'a> {
    /// Referenced card, if any
    pub card_id: Option<&'a str>,
    /// Referenced subscription, if any
    pub subscription_id: Option<&'a str>,
}

/// Fails with [`Error::ForeignRelationInvalid`] unless every present reference
/// points at a row owned by `user_id`.
///
/// Works on a plain connection or inside a database transaction.
pub async fn assert_ownership<C>(db: &C, user_id: &str, refs: RelationRefs<'_>) -> Result<()>
where
    C: ConnectionTrait,
{
    if let Some(card_id) = refs.card_id {
        let card = Card::find_by_id(card_id.to_string()).one(db).await?;
        if card.is_none_or(|c| c.user_id != user_id) {
            return Err(Error::ForeignRelationInvalid { field: "cardId" });
        }
    }

    if let Some(subscription_id) = refs.subscription_id {
        let subscription = Subscription::find_by_id(subscription_id.to_string())
            .one(db)
            .await?;
        if subscription.is_none_or(|s| s.user_id != user_id) {
            return Err(Error::ForeignRelationInvalid {
                field: "subscriptionId",
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_no_references_is_ok() -> Result<()> {
        let db = setup_test_db().await?;
        assert_ownership(&db, "nobody", RelationRefs::default()).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_owned_references_pass() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let card = create_test_card(&db, &user.id).await?;
        let subscription = create_test_subscription(&db, &user.id, 10).await?;

        let refs = RelationRefs {
            card_id: Some(&card.id),
            subscription_id: Some(&subscription.id),
        };
        assert_ownership(&db, &user.id, refs).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_foreign_or_missing_card_is_rejected() -> Result<()> {
        let (db, owner) = setup_with_user().await?;
        let intruder = create_test_user(&db, "intruder@example.com").await?;
        let card = create_test_card(&db, &owner.id).await?;

        let foreign = RelationRefs {
            card_id: Some(&card.id),
            ..Default::default()
        };
        let result = assert_ownership(&db, &intruder.id, foreign).await;
        assert!(matches!(
            result,
            Err(Error::ForeignRelationInvalid { field: "cardId" })
        ));

        let missing = RelationRefs {
            card_id: Some("no-such-card"),
            ..Default::default()
        };
        let result = assert_ownership(&db, &owner.id, missing).await;
        assert!(matches!(
            result,
            Err(Error::ForeignRelationInvalid { field: "cardId" })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_foreign_subscription_is_rejected() -> Result<()> {
        let (db, owner) = setup_with_user().await?;
        let intruder = create_test_user(&db, "intruder@example.com").await?;
        let subscription = create_test_subscription(&db, &owner.id, 5).await?;

        let refs = RelationRefs {
            subscription_id: Some(&subscription.id),
            ..Default::default()
        };
        let result = assert_ownership(&db, &intruder.id, refs).await;
        assert!(matches!(
            result,
            Err(Error::ForeignRelationInvalid {
                field: "subscriptionId"
            })
        ));
        Ok(())
    }
}
