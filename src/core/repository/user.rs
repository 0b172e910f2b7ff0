//! User profile repository

use super::{list_entities, now_timestamp, Listing};
use crate::adapters::tablestore::{CreateOutcome, DeleteOutcome, TableClient, UpdateOutcome};
use crate::config::TableSyncConfig;
use crate::core::codec;
use crate::core::scan::ScanOptions;
use crate::domain::user::USER_PARTITION;
use crate::domain::{RecordKey, Result, TableEntity, TableStoreError, TableSyncError, User, UserProfileUpdate};
use serde_json::Value;

/// Practitioner profiles keyed by email
#[derive(Clone)]
pub struct UserRepository {
    client: TableClient,
    table: String,
    scan: ScanOptions,
}

impl UserRepository {
    pub fn new(client: TableClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
            scan: ScanOptions::default(),
        }
    }

    pub fn from_config(client: TableClient, config: &TableSyncConfig) -> Self {
        Self::new(client, config.store.tables.users.clone())
            .with_scan_options(ScanOptions::from(&config.scan))
    }

    pub fn with_scan_options(mut self, scan: ScanOptions) -> Self {
        self.scan = scan;
        self
    }

    pub async fn get(&self, email: &str) -> Result<Option<User>> {
        let key = key_for(email)?;
        match self.client.get(&self.table, &key).await? {
            Some(record) => Ok(Some(codec::decode(&record)?)),
            None => Ok(None),
        }
    }

    /// Creates or refreshes a profile and returns the stored result
    ///
    /// A new profile is inserted. If the email is already registered the
    /// profile fields are merged into it and the stored `createdAt` is kept.
    /// `lastLogin` is stamped either way.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the email is blank.
    pub async fn save(&self, mut user: User) -> Result<User> {
        let email = user.email.trim().to_string();
        if email.is_empty() {
            return Err(TableSyncError::Validation("user profile requires an email".to_string()));
        }

        let now = now_timestamp();
        user.key = key_for(&email)?;
        user.email = email.clone();
        if user.created_at.is_empty() {
            user.created_at = now.clone();
        }
        user.last_login = now;

        let record = codec::encode(&user)?;
        match self.client.create(&self.table, &record).await? {
            CreateOutcome::Created => {
                tracing::info!(table = %self.table, email = %email, "User profile created");
            }
            CreateOutcome::Conflict => {
                let mut attributes = record.attributes;
                attributes.remove("createdAt");
                let attributes = codec::encode_changes(&User::SCHEMA, attributes);
                if self.client.merge(&self.table, &user.key, attributes).await? == UpdateOutcome::NotFound {
                    return Err(TableStoreError::NotFound(format!("user {email} was removed while saving")).into());
                }
                tracing::info!(table = %self.table, email = %email, "User profile refreshed");
            }
        }

        self.get(&email)
            .await?
            .ok_or_else(|| TableStoreError::NotFound(format!("user {email}")).into())
    }

    /// Changes name and/or role and stamps `lastLogin`
    ///
    /// Returns `None` when no profile exists for `email`.
    pub async fn update_profile(&self, email: &str, changes: &UserProfileUpdate) -> Result<Option<User>> {
        let key = key_for(email)?;
        let mut attributes = match serde_json::to_value(changes)? {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        attributes.insert("lastLogin".to_string(), Value::from(now_timestamp()));
        let attributes = codec::encode_changes(&User::SCHEMA, attributes);

        match self.client.merge(&self.table, &key, attributes).await? {
            UpdateOutcome::Updated => self.get(email).await,
            UpdateOutcome::NotFound => Ok(None),
        }
    }

    pub async fn delete(&self, email: &str) -> Result<DeleteOutcome> {
        let key = key_for(email)?;
        Ok(self.client.delete(&self.table, &key).await?)
    }

    pub async fn list(&self) -> Listing<User> {
        list_entities(&self.client, &self.table, self.scan).await
    }
}

fn key_for(email: &str) -> Result<RecordKey> {
    RecordKey::new(USER_PARTITION, email).map_err(TableSyncError::Validation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::tablestore::{local_store_config, InMemoryTableService};
    use fake::faker::internet::en::SafeEmail;
    use fake::faker::name::en::Name;
    use fake::Fake;
    use serde_json::json;
    use std::sync::Arc;

    const TABLE: &str = "Users";

    fn repository(service: &Arc<InMemoryTableService>) -> UserRepository {
        let client = service.connect(&local_store_config(&[TABLE])).unwrap();
        UserRepository::new(client, TABLE)
    }

    fn profile() -> User {
        User {
            name: Name().fake(),
            email: SafeEmail().fake(),
            role: "doctor".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_save_creates_profile() {
        let service = Arc::new(InMemoryTableService::new());
        let repo = repository(&service);
        let input = profile();

        let saved = repo.save(input.clone()).await.unwrap();

        assert_eq!(saved.email, input.email);
        assert_eq!(saved.id, input.email);
        assert_eq!(saved.key.row_key(), input.email);
        assert!(!saved.created_at.is_empty());
        assert_eq!(saved.created_at, saved.last_login);
    }

    #[tokio::test]
    async fn test_save_existing_keeps_created_at() {
        let service = Arc::new(InMemoryTableService::new());
        service.seed(
            TABLE,
            "user",
            "dr@example.com",
            json!({ "Name": "Old", "createdAt": "2023-01-01T00:00:00.000Z", "password": "hash" }),
        );
        let repo = repository(&service);

        let saved = repo
            .save(User {
                name: "New".to_string(),
                email: "dr@example.com".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(saved.name, "New");
        assert_eq!(saved.created_at, "2023-01-01T00:00:00.000Z");
        assert_ne!(saved.last_login, "");
        assert_eq!(saved.extra.get("password"), Some(&json!("hash")));

        let stored = service.attributes(TABLE, "user", "dr@example.com").unwrap();
        assert!(stored.get("Name").is_none());
    }

    #[tokio::test]
    async fn test_save_requires_email() {
        let service = Arc::new(InMemoryTableService::new());
        let err = repository(&service).save(User::default()).await.unwrap_err();
        assert!(matches!(err, TableSyncError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_profile() {
        let service = Arc::new(InMemoryTableService::new());
        service.seed(TABLE, "user", "a@example.com", json!({ "name": "A", "role": "nurse" }));
        let repo = repository(&service);

        let updated = repo
            .update_profile(
                "a@example.com",
                &UserProfileUpdate {
                    role: Some("doctor".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.name, "A");
        assert_eq!(updated.role, "doctor");
        assert!(!updated.last_login.is_empty());

        let missing = repo
            .update_profile("b@example.com", &UserProfileUpdate::default())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_delete_and_get() {
        let service = Arc::new(InMemoryTableService::new());
        let repo = repository(&service);
        let saved = repo.save(profile()).await.unwrap();

        assert_eq!(repo.delete(&saved.email).await.unwrap(), DeleteOutcome::Deleted);
        assert!(repo.get(&saved.email).await.unwrap().is_none());
        assert_eq!(repo.list().await.items.len(), 0);
    }
}
