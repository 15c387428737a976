use crate::errors::StoreError;
use crate::models::{AuxDocument, Profile, UserDirectory, UserRecord, Username};
use crate::storage::{DocumentLocks, load_document, load_existing, persist_document};
use chrono::Local;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use subtle::ConstantTimeEq;
use tracing::{debug, info};

const USERS_FILE: &str = "users.json";

/// Credentials and profiles in `users.json`, plus the opaque per-user
/// auxiliary documents.
#[derive(Clone)]
pub struct UserStore {
    data_dir: PathBuf,
    locks: DocumentLocks,
}

impl UserStore {
    pub fn new(data_dir: impl Into<PathBuf>, locks: DocumentLocks) -> Self {
        Self {
            data_dir: data_dir.into(),
            locks,
        }
    }

    pub fn users_path(&self) -> PathBuf {
        self.data_dir.join(USERS_FILE)
    }

    pub async fn register(
        &self,
        user: &Username,
        password: &str,
        profile: Option<Profile>,
    ) -> Result<(), StoreError> {
        if password.is_empty() {
            return Err(StoreError::validation("password must not be empty"));
        }
        let path = self.users_path();

        let _guard = self.locks.acquire(&path).await;
        let mut users: UserDirectory = load_document(&path).await?;
        if users.contains_key(user.as_str()) {
            return Err(StoreError::DuplicateKey(user.to_string()));
        }
        users.insert(
            user.to_string(),
            UserRecord {
                password_hash: hash_password(password),
                created_at: Some(Local::now().naive_local()),
                profile: profile.unwrap_or_else(|| Profile::for_new_user(user)),
                updated_at: None,
            },
        );
        persist_document(&path, &users).await?;

        info!(user = %user, "user registered");
        Ok(())
    }

    /// True only when `user` exists and `password` digests to the stored hash.
    pub async fn authenticate(&self, user: &Username, password: &str) -> Result<bool, StoreError> {
        let users: UserDirectory = load_document(&self.users_path()).await?;
        let Some(record) = users.get(user.as_str()) else {
            debug!(user = %user, "login for unknown user");
            return Ok(false);
        };

        let candidate = hash_password(password);
        Ok(candidate
            .as_bytes()
            .ct_eq(record.password_hash.to_ascii_lowercase().as_bytes())
            .into())
    }

    pub async fn profile(&self, user: &Username) -> Result<Profile, StoreError> {
        let mut users: UserDirectory = load_document(&self.users_path()).await?;
        users
            .remove(user.as_str())
            .map(|record| record.profile)
            .ok_or_else(|| unknown_user(user))
    }

    /// Replaces the stored profile wholesale.
    pub async fn update_profile(
        &self,
        user: &Username,
        profile: Profile,
    ) -> Result<Profile, StoreError> {
        let path = self.users_path();

        let _guard = self.locks.acquire(&path).await;
        let mut users: UserDirectory = load_document(&path).await?;
        let record = users
            .get_mut(user.as_str())
            .ok_or_else(|| unknown_user(user))?;
        record.profile = profile.clone();
        record.updated_at = Some(Local::now().naive_local());
        persist_document(&path, &users).await?;

        debug!(user = %user, "profile updated");
        Ok(profile)
    }

    pub fn auxiliary_path(&self, user: &Username, kind: AuxDocument) -> PathBuf {
        self.data_dir.join(user.as_str()).join(kind.file_name())
    }

    /// A missing document reads as an empty JSON object. Stored content,
    /// `null` included, is returned as written.
    pub async fn load_auxiliary(
        &self,
        user: &Username,
        kind: AuxDocument,
    ) -> Result<Value, StoreError> {
        let document: Option<Value> = load_existing(&self.auxiliary_path(user, kind)).await?;
        Ok(document.unwrap_or_else(|| Value::Object(Map::new())))
    }

    pub async fn save_auxiliary(
        &self,
        user: &Username,
        kind: AuxDocument,
        document: &Value,
    ) -> Result<(), StoreError> {
        let path = self.auxiliary_path(user, kind);
        let _guard = self.locks.acquire(&path).await;
        persist_document(&path, document).await?;
        debug!(user = %user, document = kind.file_name(), "auxiliary document saved");
        Ok(())
    }
}

/// Lowercase hex SHA-256 of the raw password.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn unknown_user(user: &Username) -> StoreError {
    StoreError::no_match(format!("unknown user '{user}'"))
}
