use async_trait::async_trait;
use bson::doc;
use mongodb::options::{FindOneAndReplaceOptions, IndexOptions, ReturnDocument};
use mongodb::IndexModel;
use tracing::{error, info};

use crate::config::mongo_conf::MongoConfig;
use crate::model::settings::ContractorSettings;
use crate::repository::repository_error::{RepositoryError, RepositoryResult};

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Stored settings, or the canonical defaults for an unconfigured tenant.
    async fn get_for_tenant(&self, tenant_id: &str) -> RepositoryResult<ContractorSettings>;
    async fn upsert(&self, settings: ContractorSettings) -> RepositoryResult<ContractorSettings>;
}

pub struct MongoSettingsRepository {
    collection: mongodb::Collection<ContractorSettings>,
}

impl MongoSettingsRepository {
    pub async fn new(config: &MongoConfig) -> Result<Self, mongodb::error::Error> {
        use mongodb::{options::ClientOptions, Client};

        let mut client_options = ClientOptions::parse(&config.uri).await?;
        client_options.app_name = Some("BrushlineBackend".to_string());
        client_options.max_pool_size = Some(config.pool_size);

        let client = Client::with_options(client_options)?;
        let db = client.database(&config.database);
        let collection = db.collection::<ContractorSettings>(config.get_settings_collection());

        let index = IndexModel::builder()
            .keys(doc! { "tenant_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        collection.create_index(index, None).await?;

        Ok(MongoSettingsRepository { collection })
    }
}

#[async_trait]
impl SettingsRepository for MongoSettingsRepository {
    #[tracing::instrument(skip(self), fields(tenant_id = %tenant_id))]
    async fn get_for_tenant(&self, tenant_id: &str) -> RepositoryResult<ContractorSettings> {
        let filter = doc! { "tenant_id": tenant_id };
        match self.collection.find_one(filter, None).await {
            Ok(Some(settings)) => Ok(settings),
            Ok(None) => {
                info!("No settings stored for tenant, using defaults");
                Ok(ContractorSettings::defaults_for(tenant_id))
            }
            Err(e) => {
                error!("Failed to fetch settings: {}", e);
                Err(RepositoryError::from(e))
            }
        }
    }

    #[tracing::instrument(skip(self, settings), fields(tenant_id = %settings.tenant_id))]
    async fn upsert(&self, settings: ContractorSettings) -> RepositoryResult<ContractorSettings> {
        // Percentages must be validated before they ever hit the store.
        settings.validate().map_err(RepositoryError::validation)?;

        info!("Upserting contractor settings");
        let filter = doc! { "tenant_id": &settings.tenant_id };
        let options = FindOneAndReplaceOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();
        let mut to_store = settings;
        to_store.id = None;
        self.collection
            .find_one_and_replace(filter, &to_store, options)
            .await
            .map_err(RepositoryError::from)?
            .ok_or_else(|| RepositoryError::database("upsert returned no document"))
    }
}
