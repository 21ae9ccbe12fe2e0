//! MongoDB client and badge record store

use bson::{doc, DateTime, Document};
use mongodb::options::{IndexOptions, UpdateOptions};
use mongodb::{Client, Collection, IndexModel};
use tracing::{debug, info};

use crate::db::schemas::{BadgeRecordDoc, BADGE_COLLECTION};
use crate::types::{BadgewayError, Result};

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Create a new MongoDB client and verify the connection
    pub async fn new(uri: &str, db_name: &str) -> Result<Self> {
        info!("Connecting to MongoDB at {}", uri);

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| BadgewayError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        // Verify connection
        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| BadgewayError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Create the badge store, applying schema indexes
    pub async fn badge_store(&self) -> Result<BadgeStore> {
        BadgeStore::new(&self.client, &self.db_name).await
    }

    /// Get the raw MongoDB client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the database name
    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Store for encrypted badge records, keyed by username.
///
/// Upsert-by-key and find-by-key are the only operations; the persistence
/// layer's per-key upsert atomicity (last writer wins per username) is the
/// sole concurrency guarantee in the system.
#[derive(Clone)]
pub struct BadgeStore {
    collection: Collection<BadgeRecordDoc>,
}

impl BadgeStore {
    /// Create the store and apply indexes
    pub async fn new(client: &Client, db_name: &str) -> Result<Self> {
        let collection = client
            .database(db_name)
            .collection::<BadgeRecordDoc>(BADGE_COLLECTION);
        let store = Self { collection };
        store.apply_indexes().await?;
        Ok(store)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<()> {
        let schema_indices = BadgeRecordDoc::into_indices();
        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.collection
            .create_indexes(indices)
            .await
            .map_err(|e| BadgewayError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert or overwrite the encrypted record for a username
    pub async fn upsert(&self, username: &str, encrypted: &str) -> Result<()> {
        let update = doc! {
            "$set": {
                "username": username,
                "encrypted": encrypted,
                "updated_at": DateTime::now(),
            }
        };

        self.collection
            .update_one(doc! { "username": username }, update)
            .with_options(UpdateOptions::builder().upsert(true).build())
            .await
            .map_err(|e| BadgewayError::Database(format!("Upsert failed: {}", e)))?;

        debug!(username = %username, "Badge record upserted");
        Ok(())
    }

    /// Find the record for a username, if any
    pub async fn find_by_username(&self, username: &str) -> Result<Option<BadgeRecordDoc>> {
        self.collection
            .find_one(doc! { "username": username })
            .await
            .map_err(|e| BadgewayError::Database(format!("Find failed: {}", e)))
    }
}
