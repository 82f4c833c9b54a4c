use crate::models::{SubjectDoc, UpdateSubjectRequest, UserDoc};
use async_trait::async_trait;
use bson::{Document, doc};
use futures::TryStreamExt;
use mongodb::{
    Collection, Database, IndexModel,
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

/// RepositoryError
///
/// Failures at the persistence boundary. Duplicate-key violations are pulled out
/// of the driver error so handlers can map them to a Conflict response; everything
/// else stays wrapped as a database failure.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("duplicate value for unique field {0}")]
    Duplicate(&'static str),
    #[error(transparent)]
    Database(#[from] mongodb::error::Error),
}

/// Repository
///
/// The abstract persistence contract. Handlers only ever see this trait, which
/// lets the concrete backend be swapped between MongoDB in production and the
/// in-memory mock in tests without touching any handler code.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) shareable across axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn list_users(&self) -> Result<Vec<UserDoc>, RepositoryError>;
    async fn get_user(&self, id: Uuid) -> Result<Option<UserDoc>, RepositoryError>;
    /// Lookup by the stored (normalized) username. Callers must normalize first.
    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserDoc>, RepositoryError>;
    async fn insert_user(&self, user: UserDoc) -> Result<(), RepositoryError>;
    /// Full-record replacement keyed by `user.id`. Can surface a username
    /// duplicate when a rename collides with the unique index.
    async fn update_user(&self, user: UserDoc) -> Result<(), RepositoryError>;
    async fn delete_user(&self, id: Uuid) -> Result<(), RepositoryError>;

    // --- Subjects ---
    async fn list_subjects(&self) -> Result<Vec<SubjectDoc>, RepositoryError>;
    async fn insert_subject(&self, subject: SubjectDoc) -> Result<(), RepositoryError>;
    /// Applies only the supplied fields. Updating a missing id is not an error;
    /// the endpoint acknowledges regardless of prior existence.
    async fn update_subject(
        &self,
        id: Uuid,
        changes: UpdateSubjectRequest,
    ) -> Result<(), RepositoryError>;
    async fn delete_subject(&self, id: Uuid) -> Result<(), RepositoryError>;
}

/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// MongoRepository
///
/// The production implementation, holding typed collection handles from an
/// explicitly injected database client. The client owns the connection pool;
/// no connection state lives outside this struct.
pub struct MongoRepository {
    users: Collection<UserDoc>,
    subjects: Collection<SubjectDoc>,
}

impl MongoRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            // Historical collection name for user records.
            users: db.collection("register"),
            subjects: db.collection("subjects"),
        }
    }

    /// Creates the unique indexes on `username` and `subjectCode`. Index creation
    /// is idempotent, so this is safe to run on every startup. These indexes are
    /// the source of truth for uniqueness; handler-side pre-checks are only an
    /// optimization.
    pub async fn ensure_indexes(&self) -> Result<(), RepositoryError> {
        let unique = IndexOptions::builder().unique(true).build();

        let username_index = IndexModel::builder()
            .keys(doc! { "username": 1 })
            .options(unique.clone())
            .build();
        self.users.create_index(username_index).await?;

        let code_index = IndexModel::builder()
            .keys(doc! { "subjectCode": 1 })
            .options(unique)
            .build();
        self.subjects.create_index(code_index).await?;

        Ok(())
    }
}

/// True when the driver error is a unique-index violation (server code 11000).
fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == 11000,
        ErrorKind::Command(command_error) => command_error.code == 11000,
        _ => false,
    }
}

fn map_write_error(err: mongodb::error::Error, field: &'static str) -> RepositoryError {
    if is_duplicate_key(&err) {
        RepositoryError::Duplicate(field)
    } else {
        RepositoryError::Database(err)
    }
}

#[async_trait]
impl Repository for MongoRepository {
    async fn list_users(&self) -> Result<Vec<UserDoc>, RepositoryError> {
        let cursor = self.users.find(doc! {}).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<UserDoc>, RepositoryError> {
        Ok(self.users.find_one(doc! { "_id": id.to_string() }).await?)
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserDoc>, RepositoryError> {
        Ok(self.users.find_one(doc! { "username": username }).await?)
    }

    async fn insert_user(&self, user: UserDoc) -> Result<(), RepositoryError> {
        self.users
            .insert_one(user)
            .await
            .map_err(|e| map_write_error(e, "username"))?;
        Ok(())
    }

    async fn update_user(&self, user: UserDoc) -> Result<(), RepositoryError> {
        self.users
            .replace_one(doc! { "_id": user.id.to_string() }, user)
            .await
            .map_err(|e| map_write_error(e, "username"))?;
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.users.delete_one(doc! { "_id": id.to_string() }).await?;
        Ok(())
    }

    async fn list_subjects(&self) -> Result<Vec<SubjectDoc>, RepositoryError> {
        let cursor = self.subjects.find(doc! {}).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert_subject(&self, subject: SubjectDoc) -> Result<(), RepositoryError> {
        self.subjects
            .insert_one(subject)
            .await
            .map_err(|e| map_write_error(e, "subjectCode"))?;
        Ok(())
    }

    async fn update_subject(
        &self,
        id: Uuid,
        changes: UpdateSubjectRequest,
    ) -> Result<(), RepositoryError> {
        let mut set = Document::new();
        if let Some(code) = changes.subject_code {
            set.insert("subjectCode", code);
        }
        if let Some(name) = changes.subject_name {
            set.insert("subjectName", name);
        }
        if let Some(credit) = changes.credit {
            set.insert("credit", credit);
        }
        if set.is_empty() {
            return Ok(());
        }

        self.subjects
            .update_one(doc! { "_id": id.to_string() }, doc! { "$set": set })
            .await
            .map_err(|e| map_write_error(e, "subjectCode"))?;
        Ok(())
    }

    async fn delete_subject(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.subjects
            .delete_one(doc! { "_id": id.to_string() })
            .await?;
        Ok(())
    }
}

/// MockRepository
///
/// In-memory implementation used by the integration tests. It mirrors the two
/// unique indexes so that conflict paths behave identically to the Mongo backend.
#[derive(Default)]
pub struct MockRepository {
    users: Mutex<HashMap<Uuid, UserDoc>>,
    subjects: Mutex<HashMap<Uuid, SubjectDoc>>,
}

impl MockRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MockRepository {
    async fn list_users(&self) -> Result<Vec<UserDoc>, RepositoryError> {
        Ok(self.users.lock().await.values().cloned().collect())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<UserDoc>, RepositoryError> {
        Ok(self.users.lock().await.get(&id).cloned())
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserDoc>, RepositoryError> {
        Ok(self
            .users
            .lock()
            .await
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn insert_user(&self, user: UserDoc) -> Result<(), RepositoryError> {
        let mut users = self.users.lock().await;
        if users.values().any(|u| u.username == user.username) {
            return Err(RepositoryError::Duplicate("username"));
        }
        users.insert(user.id, user);
        Ok(())
    }

    async fn update_user(&self, user: UserDoc) -> Result<(), RepositoryError> {
        let mut users = self.users.lock().await;
        if users
            .values()
            .any(|u| u.id != user.id && u.username == user.username)
        {
            return Err(RepositoryError::Duplicate("username"));
        }
        users.insert(user.id, user);
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.users.lock().await.remove(&id);
        Ok(())
    }

    async fn list_subjects(&self) -> Result<Vec<SubjectDoc>, RepositoryError> {
        Ok(self.subjects.lock().await.values().cloned().collect())
    }

    async fn insert_subject(&self, subject: SubjectDoc) -> Result<(), RepositoryError> {
        let mut subjects = self.subjects.lock().await;
        if subjects
            .values()
            .any(|s| s.subject_code == subject.subject_code)
        {
            return Err(RepositoryError::Duplicate("subjectCode"));
        }
        subjects.insert(subject.id, subject);
        Ok(())
    }

    async fn update_subject(
        &self,
        id: Uuid,
        changes: UpdateSubjectRequest,
    ) -> Result<(), RepositoryError> {
        let mut subjects = self.subjects.lock().await;
        // An unknown id matches nothing: no write, no constraint to violate.
        if !subjects.contains_key(&id) {
            return Ok(());
        }
        if let Some(code) = &changes.subject_code {
            if subjects
                .values()
                .any(|s| s.id != id && s.subject_code == *code)
            {
                return Err(RepositoryError::Duplicate("subjectCode"));
            }
        }
        if let Some(subject) = subjects.get_mut(&id) {
            if let Some(code) = changes.subject_code {
                subject.subject_code = code;
            }
            if let Some(name) = changes.subject_name {
                subject.subject_name = name;
            }
            if let Some(credit) = changes.credit {
                subject.credit = credit;
            }
        }
        Ok(())
    }

    async fn delete_subject(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.subjects.lock().await.remove(&id);
        Ok(())
    }
}
