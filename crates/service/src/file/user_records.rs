use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::errors::ServiceError;
use crate::storage::json_array_store::JsonArrayStore;

const MISSING_FIELDS: &str = "Missing name, email, or age";

/// A stored user record.
///
/// Serialization follows declaration order, so the persisted document keeps
/// `id, name, email, age` stable. `age` stays a raw JSON number: an integer
/// written as `30` must read back and re-serialize as `30`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub age: Number,
}

/// Creation input. Every field is optional at the wire level so presence is
/// checked here, with one message for all three fields, rather than by the
/// JSON decoder.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<Number>,
}

impl NewUser {
    /// Presence checks only: `name` and `email` must be present and
    /// non-empty, `age` merely present. `age: 0` passes.
    fn into_fields(self) -> Result<(String, String, Number), ServiceError> {
        match (self.name, self.email, self.age) {
            (Some(name), Some(email), Some(age)) if !name.is_empty() && !email.is_empty() => {
                Ok((name, email, age))
            }
            _ => Err(ServiceError::Validation(MISSING_FIELDS.into())),
        }
    }
}

/// Partial update: absent fields keep their stored value. Supplied values
/// are not re-validated.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<Number>,
}

/// File store: the whole user collection as one JSON document. Each
/// operation is a fresh read (and, for mutations, a full write-back) of
/// that document.
#[derive(Clone)]
pub struct UserStore {
    store: JsonArrayStore<User>,
}

impl UserStore {
    /// Initialize the store; the parent directory is created if missing.
    pub async fn new<P: Into<PathBuf>>(path: P) -> Arc<Self> {
        Arc::new(Self { store: JsonArrayStore::new(path).await })
    }

    /// List all users in insertion order.
    pub async fn list(&self) -> Vec<User> {
        self.store.read().await
    }

    /// Look up a user by id. Linear scan; ids are opaque strings.
    pub async fn get(&self, id: &str) -> Option<User> {
        self.store.read().await.into_iter().find(|u| u.id == id)
    }

    /// Append a new record with a freshly generated id and persist the
    /// collection.
    pub async fn create(&self, input: NewUser) -> Result<User, ServiceError> {
        let (name, email, age) = input.into_fields()?;
        let mut users = self.store.read().await;
        let user = User { id: next_id(), name, email, age };
        users.push(user.clone());
        self.store.write(&users).await?;
        Ok(user)
    }

    /// Overwrite only the fields supplied in `patch`, persist the whole
    /// collection, and return the updated record.
    pub async fn update(&self, id: &str, patch: UserPatch) -> Result<User, ServiceError> {
        let mut users = self.store.read().await;
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| ServiceError::not_found("user"))?;
        if let Some(name) = patch.name {
            user.name = name;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(age) = patch.age {
            user.age = age;
        }
        let updated = user.clone();
        self.store.write(&users).await?;
        Ok(updated)
    }

    /// Remove the first record matching `id`, persist the remainder, and
    /// return the removed record.
    pub async fn delete(&self, id: &str) -> Result<User, ServiceError> {
        let mut users = self.store.read().await;
        let index = users
            .iter()
            .position(|u| u.id == id)
            .ok_or_else(|| ServiceError::not_found("user"))?;
        let removed = users.remove(index);
        self.store.write(&users).await?;
        Ok(removed)
    }
}

/// Record ids are the creation wall-clock time in milliseconds as a decimal
/// string. Two creations inside the same millisecond collide; no uniqueness
/// is enforced.
fn next_id() -> String {
    Utc::now().timestamp_millis().to_string()
}
