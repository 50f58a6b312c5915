//! Price negotiation between a buyer and the farmer selling a product.
//!
//! ```text
//! pending   --farmer accept/reject/counter-->  accepted | rejected | countered
//! countered --farmer accept/reject/counter-->  accepted | rejected | countered
//! countered --buyer  accept/reject/counter-->  accepted | rejected | pending
//! ```
//!
//! `accepted` and `rejected` are terminal.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;

use crate::entities::offer::{self, OfferStatus, Party};
use crate::entities::product;
use crate::error::ApiError;
use crate::money;
use crate::principal::{BuyerId, FarmerId, Principal};
use crate::services::accounts;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OfferAction {
    Accept,
    Reject,
    Counter,
}

impl FromStr for OfferAction {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accept" => Ok(Self::Accept),
            "reject" => Ok(Self::Reject),
            "counter" => Ok(Self::Counter),
            _ => Err(ApiError::Validation(
                "Invalid action. Must be accept, reject, or counter".into(),
            )),
        }
    }
}

impl fmt::Display for OfferAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
            Self::Counter => "counter",
        };
        f.write_str(value)
    }
}

/// The status an offer moves to when `actor` takes `action` on it.
pub fn next_status(
    current: OfferStatus,
    actor: Party,
    action: OfferAction,
) -> Result<OfferStatus, ApiError> {
    if current.is_terminal() {
        return Err(ApiError::InvalidState(format!("Offer is already {current}")));
    }

    match (actor, current) {
        (Party::Farmer, OfferStatus::Pending | OfferStatus::Countered) => Ok(match action {
            OfferAction::Accept => OfferStatus::Accepted,
            OfferAction::Reject => OfferStatus::Rejected,
            OfferAction::Counter => OfferStatus::Countered,
        }),
        (Party::Buyer, OfferStatus::Countered) => Ok(match action {
            OfferAction::Accept => OfferStatus::Accepted,
            OfferAction::Reject => OfferStatus::Rejected,
            OfferAction::Counter => OfferStatus::Pending,
        }),
        (Party::Buyer, _) => Err(ApiError::InvalidState(
            "Offer is not awaiting a buyer response".into(),
        )),
        (Party::Farmer, _) => Err(ApiError::InvalidState(format!(
            "Offer cannot be answered while {current}"
        ))),
    }
}

#[derive(Debug, Serialize)]
pub struct OfferView {
    pub offer_id: i32,
    pub product_id: i32,
    pub product_name: String,
    pub farmer_id: i32,
    pub buyer_id: i32,
    pub offer_price: Decimal,
    pub status: OfferStatus,
    pub last_actor: Party,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

impl OfferView {
    fn new(offer: offer::Model, product: &product::Model) -> Self {
        OfferView {
            offer_id: offer.id,
            product_id: offer.product_id,
            product_name: product.name.clone(),
            farmer_id: product.farmer_id,
            buyer_id: offer.buyer_id,
            offer_price: money::from_cents(offer.offer_price_cents),
            status: offer.status,
            last_actor: offer.last_actor,
            created_at: offer.created_at,
            updated_at: offer.updated_at,
        }
    }
}

pub async fn create_offer(
    txn: &DatabaseTransaction,
    buyer: BuyerId,
    product_id: i32,
    offer_price: Decimal,
) -> Result<offer::Model, ApiError> {
    accounts::buyer_profile(txn, buyer).await?;

    let product = product::Entity::find_by_id(product_id)
        .one(txn)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".into()))?;
    if !product.is_active {
        return Err(ApiError::Unavailable(format!(
            "Product {} is not available",
            product.name
        )));
    }

    let now = Utc::now();
    let offer = offer::ActiveModel {
        product_id: Set(product.id),
        buyer_id: Set(buyer.0),
        offer_price_cents: Set(money::price_to_cents(offer_price)?),
        status: Set(OfferStatus::Pending),
        last_actor: Set(Party::Buyer),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(txn)
    .await?;
    Ok(offer)
}

async fn find_offer(
    txn: &DatabaseTransaction,
    offer_id: i32,
) -> Result<(offer::Model, product::Model), ApiError> {
    let not_found = || ApiError::NotFound("Offer not found".into());
    let (offer, product) = offer::Entity::find_by_id(offer_id)
        .find_also_related(product::Entity)
        .one(txn)
        .await?
        .ok_or_else(not_found)?;
    Ok((offer, product.ok_or_else(not_found)?))
}

async fn apply(
    txn: &DatabaseTransaction,
    offer: offer::Model,
    actor: Party,
    action: OfferAction,
    counter_price: Option<Decimal>,
) -> Result<offer::Model, ApiError> {
    let counter_cents = match (action, counter_price) {
        (OfferAction::Counter, None) => {
            return Err(ApiError::Validation(
                "Counter price is required for counter action".into(),
            ))
        }
        (OfferAction::Counter, Some(price)) => Some(money::price_to_cents(price)?),
        _ => None,
    };

    let status = next_status(offer.status, actor, action)?;

    let mut offer: offer::ActiveModel = offer.into();
    offer.status = Set(status);
    offer.last_actor = Set(actor);
    offer.updated_at = Set(Utc::now());
    if let Some(cents) = counter_cents {
        offer.offer_price_cents = Set(cents);
    }
    Ok(offer.update(txn).await?)
}

/// The farmer selling the product answers the current offer.
pub async fn respond_as_farmer(
    txn: &DatabaseTransaction,
    farmer: FarmerId,
    offer_id: i32,
    action: OfferAction,
    counter_price: Option<Decimal>,
) -> Result<offer::Model, ApiError> {
    let (offer, product) = find_offer(txn, offer_id).await?;
    if product.farmer_id != farmer.0 {
        return Err(ApiError::Forbidden(
            "You are not authorized to respond to this offer".into(),
        ));
    }
    apply(txn, offer, Party::Farmer, action, counter_price).await
}

/// The buyer answers a farmer's counter offer.
pub async fn respond_as_buyer(
    txn: &DatabaseTransaction,
    buyer: BuyerId,
    offer_id: i32,
    action: OfferAction,
    counter_price: Option<Decimal>,
) -> Result<offer::Model, ApiError> {
    let (offer, _) = find_offer(txn, offer_id).await?;
    if offer.buyer_id != buyer.0 {
        return Err(ApiError::Forbidden(
            "You are not authorized to respond to this offer".into(),
        ));
    }
    apply(txn, offer, Party::Buyer, action, counter_price).await
}

/// Newest first. Buyers see their own offers, farmers the offers made on
/// their products.
pub async fn list_offers(
    txn: &DatabaseTransaction,
    principal: Principal,
) -> Result<Vec<OfferView>, ApiError> {
    let query = match principal {
        Principal::Buyer(buyer) => {
            accounts::buyer_profile(txn, buyer).await?;
            offer::Entity::find()
                .filter(offer::Column::BuyerId.eq(buyer.0))
                .find_also_related(product::Entity)
        }
        Principal::Farmer(farmer) => {
            accounts::farmer_profile(txn, farmer).await?;
            offer::Entity::find()
                .find_also_related(product::Entity)
                .filter(product::Column::FarmerId.eq(farmer.0))
        }
    };

    let rows = query
        .order_by_desc(offer::Column::CreatedAt)
        .order_by_desc(offer::Column::Id)
        .all(txn)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(offer, product)| product.map(|product| OfferView::new(offer, &product)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing;
    use sea_orm::TransactionTrait;

    fn price(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    #[test]
    fn pending_reaches_only_the_farmer_outcomes() {
        let reachable: Vec<_> = [OfferAction::Accept, OfferAction::Reject, OfferAction::Counter]
            .into_iter()
            .map(|action| next_status(OfferStatus::Pending, Party::Farmer, action).unwrap())
            .collect();
        assert_eq!(
            reachable,
            vec![
                OfferStatus::Accepted,
                OfferStatus::Rejected,
                OfferStatus::Countered
            ]
        );
        assert!(next_status(OfferStatus::Pending, Party::Buyer, OfferAction::Accept).is_err());
    }

    #[test]
    fn terminal_offers_do_not_move() {
        for status in [OfferStatus::Accepted, OfferStatus::Rejected] {
            for actor in [Party::Buyer, Party::Farmer] {
                for action in [OfferAction::Accept, OfferAction::Reject, OfferAction::Counter] {
                    assert!(matches!(
                        next_status(status, actor, action),
                        Err(ApiError::InvalidState(_))
                    ));
                }
            }
        }
    }

    #[test]
    fn buyer_counter_sends_the_offer_back_to_pending() {
        assert_eq!(
            next_status(OfferStatus::Countered, Party::Buyer, OfferAction::Counter),
            Ok(OfferStatus::Pending)
        );
        assert_eq!(
            next_status(OfferStatus::Countered, Party::Farmer, OfferAction::Counter),
            Ok(OfferStatus::Countered)
        );
    }

    #[test]
    fn unknown_actions_are_rejected() {
        assert_eq!("counter".parse::<OfferAction>(), Ok(OfferAction::Counter));
        assert!(matches!(
            "haggle".parse::<OfferAction>(),
            Err(ApiError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn counter_then_accept_settles_on_the_counter_price() {
        let db = testing::database().await;
        let farmer = testing::farmer(&db, "grower").await;
        let buyer = testing::buyer(&db, "shopper").await;
        let product = testing::product(&db, farmer, "Honey", 1000, 5).await;

        let txn = db.begin().await.unwrap();
        let offer = create_offer(&txn, buyer, product.id, price("8.00"))
            .await
            .unwrap();
        assert_eq!(offer.status, OfferStatus::Pending);
        assert_eq!(offer.last_actor, Party::Buyer);

        let countered = respond_as_farmer(
            &txn,
            farmer,
            offer.id,
            OfferAction::Counter,
            Some(price("9.00")),
        )
        .await
        .unwrap();
        assert_eq!(countered.status, OfferStatus::Countered);
        assert_eq!(countered.offer_price_cents, 900);
        assert_eq!(countered.last_actor, Party::Farmer);

        let accepted = respond_as_buyer(&txn, buyer, offer.id, OfferAction::Accept, None)
            .await
            .unwrap();
        assert_eq!(accepted.status, OfferStatus::Accepted);
        assert_eq!(accepted.offer_price_cents, 900);
    }

    #[tokio::test]
    async fn only_the_parties_may_respond() {
        let db = testing::database().await;
        let farmer = testing::farmer(&db, "grower").await;
        let other_farmer = testing::farmer(&db, "rival").await;
        let buyer = testing::buyer(&db, "shopper").await;
        let other_buyer = testing::buyer(&db, "lurker").await;
        let product = testing::product(&db, farmer, "Eggs", 400, 12).await;

        let txn = db.begin().await.unwrap();
        let offer = create_offer(&txn, buyer, product.id, price("3.50"))
            .await
            .unwrap();

        assert!(matches!(
            respond_as_farmer(&txn, other_farmer, offer.id, OfferAction::Accept, None).await,
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(
            respond_as_buyer(&txn, other_buyer, offer.id, OfferAction::Accept, None).await,
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(
            respond_as_farmer(&txn, farmer, offer.id, OfferAction::Counter, None).await,
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            respond_as_farmer(&txn, farmer, 4242, OfferAction::Accept, None).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn listings_are_scoped_and_newest_first() {
        let db = testing::database().await;
        let farmer = testing::farmer(&db, "grower").await;
        let other_farmer = testing::farmer(&db, "rival").await;
        let buyer = testing::buyer(&db, "shopper").await;
        let mine = testing::product(&db, farmer, "Cheese", 900, 3).await;
        let theirs = testing::product(&db, other_farmer, "Butter", 700, 3).await;

        let txn = db.begin().await.unwrap();
        let first = create_offer(&txn, buyer, mine.id, price("8")).await.unwrap();
        let second = create_offer(&txn, buyer, theirs.id, price("6")).await.unwrap();

        let buyer_view = list_offers(&txn, Principal::Buyer(buyer)).await.unwrap();
        let ids: Vec<_> = buyer_view.iter().map(|offer| offer.offer_id).collect();
        assert_eq!(ids, vec![second.id, first.id]);

        let farmer_view = list_offers(&txn, Principal::Farmer(farmer)).await.unwrap();
        assert_eq!(farmer_view.len(), 1);
        assert_eq!(farmer_view[0].product_name, "Cheese");
        assert_eq!(farmer_view[0].offer_price, price("8.00"));
    }
}
