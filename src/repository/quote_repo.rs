use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson};
use chrono::{DateTime, Utc};
use futures::stream::TryStreamExt;
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument};
use mongodb::IndexModel;
use tracing::{error, info};

use crate::config::mongo_conf::MongoConfig;
use crate::model::pricing::Tier;
use crate::model::quote::{AreaSelection, Quote, QuoteStatus, QuoteTotals, TierChangeRequest};
use crate::repository::repository_error::{RepositoryError, RepositoryResult};

/// Quote persistence. Lifecycle transitions are compare-and-set: each takes
/// effect only if the stored document still satisfies the transition's
/// precondition, so two racing requests cannot both win.
#[async_trait]
pub trait QuoteRepository: Send + Sync {
    async fn create(&self, quote: Quote) -> RepositoryResult<Quote>;
    async fn get_by_id(&self, id: ObjectId) -> RepositoryResult<Quote>;
    /// Full-document replace used by staff edits while drafting.
    async fn update(&self, id: ObjectId, quote: Quote) -> RepositoryResult<Quote>;
    async fn list(&self, tenant_id: &str, page: u32, limit: u32) -> RepositoryResult<Vec<Quote>>;
    /// Soft-deactivation; quotes are never hard-deleted.
    async fn deactivate(&self, id: ObjectId) -> RepositoryResult<()>;

    async fn mark_sent(&self, id: ObjectId, valid_until: DateTime<Utc>) -> RepositoryResult<Quote>;
    async fn mark_accepted(
        &self,
        id: ObjectId,
        tier: Tier,
        totals: QuoteTotals,
    ) -> RepositoryResult<Quote>;
    async fn mark_declined(&self, id: ObjectId, reason: &str) -> RepositoryResult<Quote>;
    /// The single atomic deposit write: transaction id, portal window and
    /// status flip together, guarded on `accepted` + no prior transaction.
    async fn record_deposit(
        &self,
        id: ObjectId,
        transaction_id: &str,
        opened_at: DateTime<Utc>,
        closes_at: DateTime<Utc>,
    ) -> RepositoryResult<Quote>;
    async fn set_area_selection(
        &self,
        id: ObjectId,
        area_index: usize,
        selection: AreaSelection,
    ) -> RepositoryResult<Quote>;
    /// deposit_paid → selections_complete, closing the portal in the same write.
    async fn complete_selections(
        &self,
        id: ObjectId,
        closed_at: DateTime<Utc>,
    ) -> RepositoryResult<Quote>;
    /// Lazy portal lock; only applies while the portal is still flagged open.
    async fn close_portal(&self, id: ObjectId, closed_at: DateTime<Utc>) -> RepositoryResult<Quote>;
    async fn set_tier_change_request(
        &self,
        id: ObjectId,
        request: TierChangeRequest,
    ) -> RepositoryResult<Quote>;
    /// Staff rejection: the pending request clears and nothing else moves.
    async fn clear_tier_change_request(&self, id: ObjectId) -> RepositoryResult<Quote>;
    /// Staff approval: re-priced totals land and the pending request clears,
    /// guarded on `deposit_paid`.
    async fn apply_tier_change(
        &self,
        id: ObjectId,
        tier: Tier,
        totals: QuoteTotals,
    ) -> RepositoryResult<Quote>;
}

/// Page/limit come straight off the query string, so the skip is computed
/// in u64 to keep an absurd page number from overflowing.
fn page_skip(page: u32, limit: u32) -> u64 {
    (page.max(1) as u64 - 1) * limit as u64
}

pub struct MongoQuoteRepository {
    collection: mongodb::Collection<Quote>,
}

impl MongoQuoteRepository {
    /// Create a new MongoQuoteRepository using MongoConfig
    pub async fn new(config: &MongoConfig) -> Result<Self, mongodb::error::Error> {
        use mongodb::{options::{ClientOptions, Credential}, Client};

        let mut client_options = ClientOptions::parse(&config.uri).await?;
        client_options.app_name = Some("BrushlineBackend".to_string());
        client_options.max_pool_size = Some(config.pool_size);
        client_options.connect_timeout =
            Some(std::time::Duration::from_secs(config.connection_timeout_secs));

        if let (Some(ref username), Some(ref password)) = (&config.username, &config.password) {
            client_options.credential = Some(
                Credential::builder().username(username.clone()).password(password.clone()).build(),
            );
        }

        let client = Client::with_options(client_options)?;
        let db = client.database(&config.database);
        let collection = db.collection::<Quote>(config.get_quote_collection());

        let repo = MongoQuoteRepository { collection };
        repo.ensure_indexes().await?;
        Ok(repo)
    }

    /// Uniqueness constraints backing the §5-style race guarantees:
    /// quote numbers per tenant, and at most one quote per verified
    /// payment transaction.
    async fn ensure_indexes(&self) -> Result<(), mongodb::error::Error> {
        let quote_number_index = IndexModel::builder()
            .keys(doc! { "tenant_id": 1, "quote_number": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        let transaction_index = IndexModel::builder()
            .keys(doc! { "deposit_transaction_id": 1 })
            .options(IndexOptions::builder().unique(true).sparse(true).build())
            .build();
        self.collection.create_index(quote_number_index, None).await?;
        self.collection.create_index(transaction_index, None).await?;
        Ok(())
    }

    fn allocate_quote_number() -> String {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!("BL-{}-{}", Utc::now().format("%Y"), &suffix[..6].to_uppercase())
    }

    /// Run a CAS update; a missed precondition is distinguished from a
    /// missing document so callers can report which one happened.
    async fn cas_update(
        &self,
        id: ObjectId,
        filter: bson::Document,
        update: bson::Document,
        precondition: &str,
    ) -> RepositoryResult<Quote> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let result = self
            .collection
            .find_one_and_update(filter, update, options)
            .await
            .map_err(RepositoryError::from)?;
        match result {
            Some(quote) => Ok(quote),
            None => {
                // Either the quote is gone or another write got there first.
                match self.collection.find_one(doc! { "_id": id }, None).await {
                    Ok(Some(current)) => Err(RepositoryError::precondition(format!(
                        "expected {}, quote is {}",
                        precondition, current.status
                    ))),
                    Ok(None) => {
                        Err(RepositoryError::not_found(format!("Quote not found for ID: {}", id)))
                    }
                    Err(e) => Err(RepositoryError::from(e)),
                }
            }
        }
    }

    fn to_bson<T: serde::Serialize>(value: &T) -> RepositoryResult<Bson> {
        bson::to_bson(value).map_err(RepositoryError::from)
    }
}

#[async_trait]
impl QuoteRepository for MongoQuoteRepository {
    #[tracing::instrument(skip(self, quote), fields(tenant_id = %quote.tenant_id))]
    async fn create(&self, quote: Quote) -> RepositoryResult<Quote> {
        info!("Creating new quote");
        let mut new_quote = quote;
        new_quote.id = Some(ObjectId::new());
        new_quote.status = QuoteStatus::Draft;
        new_quote.active = true;
        let now = Utc::now();
        new_quote.created_at = Some(now);
        new_quote.updated_at = Some(now);

        // Number allocation races with concurrent draft saves; the unique
        // index arbitrates and we retry with a fresh number.
        for attempt in 0..3 {
            new_quote.quote_number = Some(Self::allocate_quote_number());
            match self.collection.insert_one(new_quote.clone(), None).await {
                Ok(_) => {
                    info!(quote_number = ?new_quote.quote_number, "Quote created successfully");
                    return Ok(new_quote);
                }
                Err(e) => {
                    let mapped = RepositoryError::from(e);
                    if matches!(mapped, RepositoryError::AlreadyExists(_)) && attempt < 2 {
                        error!("Quote number collision, retrying allocation");
                        continue;
                    }
                    error!("Failed to create quote: {}", mapped);
                    return Err(mapped);
                }
            }
        }
        unreachable!("insert loop returns on the final attempt")
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    async fn get_by_id(&self, id: ObjectId) -> RepositoryResult<Quote> {
        let filter = doc! { "_id": id, "active": true };
        match self.collection.find_one(filter, None).await {
            Ok(Some(quote)) => Ok(quote),
            Ok(None) => {
                error!("Quote not found for ID: {}", id);
                Err(RepositoryError::not_found(format!("Quote not found for ID: {}", id)))
            }
            Err(e) => {
                error!("Failed to fetch quote by ID: {}", e);
                Err(RepositoryError::from(e))
            }
        }
    }

    #[tracing::instrument(skip(self, quote), fields(id = %id))]
    async fn update(&self, id: ObjectId, quote: Quote) -> RepositoryResult<Quote> {
        info!("Updating quote");
        let filter = doc! { "_id": id };
        let mut document = bson::to_document(&quote).map_err(RepositoryError::from)?;
        document.remove("_id");
        document.insert("updated_at", Self::to_bson(&Utc::now())?);
        let update = doc! { "$set": document };
        let result = self.collection.update_one(filter, update, None).await;
        match result {
            Ok(r) if r.matched_count > 0 => {
                info!("Quote updated successfully for ID: {}", id);
                self.get_by_id(id).await
            }
            Ok(_) => {
                error!("No quote found to update for ID: {}", id);
                Err(RepositoryError::not_found(format!("No quote found to update for ID: {}", id)))
            }
            Err(e) => {
                error!("Failed to update quote: {}", e);
                Err(RepositoryError::from(e))
            }
        }
    }

    #[tracing::instrument(skip(self), fields(tenant_id = %tenant_id, page, limit))]
    async fn list(&self, tenant_id: &str, page: u32, limit: u32) -> RepositoryResult<Vec<Quote>> {
        let skip = page_skip(page, limit);
        let filter = doc! { "tenant_id": tenant_id, "active": true };
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .skip(skip)
            .limit(limit as i64)
            .build();
        let cursor = self.collection.find(filter, options).await.map_err(RepositoryError::from)?;
        let quotes: Vec<Quote> = cursor.try_collect().await.map_err(RepositoryError::from)?;
        info!("Fetched {} quotes", quotes.len());
        Ok(quotes)
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    async fn deactivate(&self, id: ObjectId) -> RepositoryResult<()> {
        info!("Deactivating quote");
        let update = doc! { "$set": { "active": false, "updated_at": Self::to_bson(&Utc::now())? } };
        let result = self.collection.update_one(doc! { "_id": id }, update, None).await;
        match result {
            Ok(r) if r.matched_count > 0 => Ok(()),
            Ok(_) => Err(RepositoryError::not_found(format!("Quote not found for ID: {}", id))),
            Err(e) => Err(RepositoryError::from(e)),
        }
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    async fn mark_sent(&self, id: ObjectId, valid_until: DateTime<Utc>) -> RepositoryResult<Quote> {
        let filter = doc! { "_id": id, "active": true, "status": "draft" };
        let update = doc! { "$set": {
            "status": "sent",
            "valid_until": Self::to_bson(&valid_until)?,
            "updated_at": Self::to_bson(&Utc::now())?,
        } };
        self.cas_update(id, filter, update, "draft").await
    }

    #[tracing::instrument(skip(self, totals), fields(id = %id, tier = %tier))]
    async fn mark_accepted(
        &self,
        id: ObjectId,
        tier: Tier,
        totals: QuoteTotals,
    ) -> RepositoryResult<Quote> {
        let filter = doc! { "_id": id, "active": true, "status": "sent" };
        let update = doc! { "$set": {
            "status": "accepted",
            "selected_tier": tier.as_str(),
            "totals": Self::to_bson(&totals)?,
            "updated_at": Self::to_bson(&Utc::now())?,
        } };
        self.cas_update(id, filter, update, "sent").await
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    async fn mark_declined(&self, id: ObjectId, reason: &str) -> RepositoryResult<Quote> {
        let filter = doc! { "_id": id, "active": true, "status": "sent" };
        let update = doc! { "$set": {
            "status": "declined",
            "decline_reason": reason,
            "updated_at": Self::to_bson(&Utc::now())?,
        } };
        self.cas_update(id, filter, update, "sent").await
    }

    #[tracing::instrument(skip(self), fields(id = %id, transaction_id = %transaction_id))]
    async fn record_deposit(
        &self,
        id: ObjectId,
        transaction_id: &str,
        opened_at: DateTime<Utc>,
        closes_at: DateTime<Utc>,
    ) -> RepositoryResult<Quote> {
        info!("Recording verified deposit");
        let filter = doc! {
            "_id": id,
            "active": true,
            "status": "accepted",
            "deposit_transaction_id": Bson::Null,
        };
        let update = doc! { "$set": {
            "status": "deposit_paid",
            "deposit_transaction_id": transaction_id,
            "portal_open": true,
            "portal_opened_at": Self::to_bson(&opened_at)?,
            "portal_closes_at": Self::to_bson(&closes_at)?,
            "updated_at": Self::to_bson(&Utc::now())?,
        } };
        self.cas_update(id, filter, update, "accepted with no recorded deposit").await
    }

    #[tracing::instrument(skip(self, selection), fields(id = %id, area_index))]
    async fn set_area_selection(
        &self,
        id: ObjectId,
        area_index: usize,
        selection: AreaSelection,
    ) -> RepositoryResult<Quote> {
        let filter = doc! { "_id": id, "active": true, "status": "deposit_paid" };
        let field = format!("areas.{}.selection", area_index);
        let update = doc! { "$set": {
            field: Self::to_bson(&selection)?,
            "updated_at": Self::to_bson(&Utc::now())?,
        } };
        self.cas_update(id, filter, update, "deposit_paid").await
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    async fn complete_selections(
        &self,
        id: ObjectId,
        closed_at: DateTime<Utc>,
    ) -> RepositoryResult<Quote> {
        let filter = doc! { "_id": id, "active": true, "status": "deposit_paid" };
        let update = doc! { "$set": {
            "status": "selections_complete",
            "portal_open": false,
            "portal_closed_at": Self::to_bson(&closed_at)?,
            "updated_at": Self::to_bson(&Utc::now())?,
        } };
        self.cas_update(id, filter, update, "deposit_paid").await
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    async fn close_portal(&self, id: ObjectId, closed_at: DateTime<Utc>) -> RepositoryResult<Quote> {
        let filter = doc! { "_id": id, "active": true, "portal_open": true };
        let update = doc! { "$set": {
            "portal_open": false,
            "portal_closed_at": Self::to_bson(&closed_at)?,
            "updated_at": Self::to_bson(&Utc::now())?,
        } };
        self.cas_update(id, filter, update, "an open portal").await
    }

    #[tracing::instrument(skip(self, request), fields(id = %id))]
    async fn set_tier_change_request(
        &self,
        id: ObjectId,
        request: TierChangeRequest,
    ) -> RepositoryResult<Quote> {
        let filter = doc! { "_id": id, "active": true, "status": "deposit_paid" };
        let update = doc! { "$set": {
            "tier_change_request": Self::to_bson(&request)?,
            "updated_at": Self::to_bson(&Utc::now())?,
        } };
        self.cas_update(id, filter, update, "deposit_paid").await
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    async fn clear_tier_change_request(&self, id: ObjectId) -> RepositoryResult<Quote> {
        let filter = doc! { "_id": id, "active": true, "status": "deposit_paid" };
        let update = doc! {
            "$set": { "updated_at": Self::to_bson(&Utc::now())? },
            "$unset": { "tier_change_request": "" },
        };
        self.cas_update(id, filter, update, "deposit_paid").await
    }

    #[tracing::instrument(skip(self, totals), fields(id = %id, tier = %tier))]
    async fn apply_tier_change(
        &self,
        id: ObjectId,
        tier: Tier,
        totals: QuoteTotals,
    ) -> RepositoryResult<Quote> {
        let filter = doc! { "_id": id, "active": true, "status": "deposit_paid" };
        let update = doc! {
            "$set": {
                "selected_tier": tier.as_str(),
                "totals": Self::to_bson(&totals)?,
                "updated_at": Self::to_bson(&Utc::now())?,
            },
            "$unset": { "tier_change_request": "" },
        };
        self.cas_update(id, filter, update, "deposit_paid").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_skip_treats_page_zero_as_first_page() {
        assert_eq!(page_skip(0, 20), 0);
        assert_eq!(page_skip(1, 20), 0);
        assert_eq!(page_skip(3, 20), 40);
    }

    #[test]
    fn test_page_skip_does_not_overflow_on_huge_pages() {
        assert_eq!(page_skip(50_000_000, 100), 4_999_999_900);
        assert_eq!(page_skip(u32::MAX, u32::MAX), (u32::MAX as u64 - 1) * u32::MAX as u64);
    }
}
