use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// --- Document Models (Mapped to MongoDB collections) ---

/// UserDoc
///
/// The canonical user record stored in the `register` collection. The `password`
/// field only ever holds a bcrypt hash; plaintext never reaches this struct.
/// `username` is stored trimmed and lowercased, and carries a unique index.
///
/// This type is persistence-only: responses go through the DTOs below so that the
/// hash cannot leak into a JSON body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDoc {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub password: String,
    /// Stored as a native BSON datetime so Mongo can index and compare it.
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// SubjectDoc
///
/// An academic subject in the `subjects` collection. `subjectCode` carries a
/// unique index; the handlers perform no pre-check, the index is the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectDoc {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub subject_code: String,
    pub subject_name: String,
    pub credit: f64,
}

// --- Request Payloads (Input Schemas) ---

/// Input payload for POST /api/users/create. All four fields are required and
/// must be non-empty after trimming. `serde(default)` lets an omitted field
/// arrive as an empty string so the handler's presence check answers the 400,
/// rather than the extractor's own rejection.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub password: String,
}

/// Partial update payload for PUT /api/users/edit/{id}. Only supplied fields
/// change; a supplied password is re-hashed before storage.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Input payload for POST /api/login. Omitted fields default to empty so the
/// handler's presence check owns the failure response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Input payload for POST /api/subjects. Fields default when omitted; subject
/// creation performs no presence validation, matching the established behavior.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateSubjectRequest {
    pub subject_code: String,
    pub subject_name: String,
    pub credit: f64,
}

/// Partial update payload for PUT /api/subjects/{id}.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubjectRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit: Option<f64>,
}

// --- Response Payloads (Output Schemas) ---

/// UserSummary
///
/// The list-endpoint projection: id, username, and creation time only. Names and
/// the password hash are stripped before anything leaves the handler.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserDoc> for UserSummary {
    fn from(user: UserDoc) -> Self {
        Self {
            id: user.id,
            username: user.username,
            created_at: user.created_at,
        }
    }
}

/// UserProfile
///
/// The full user record minus the password hash. Returned by get-by-id and by a
/// successful update.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserDoc> for UserProfile {
    fn from(user: UserDoc) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            created_at: user.created_at,
        }
    }
}

/// Successful login payload. Field casing matches the established wire contract
/// (lowercase `firstname`/`lastname`, `access_token`).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub access_token: String,
}

/// Subject record as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubjectResponse {
    pub id: Uuid,
    pub subject_code: String,
    pub subject_name: String,
    pub credit: f64,
}

impl From<SubjectDoc> for SubjectResponse {
    fn from(subject: SubjectDoc) -> Self {
        Self {
            id: subject.id,
            subject_code: subject.subject_code,
            subject_name: subject.subject_name,
            credit: subject.credit,
        }
    }
}

/// Generic acknowledgement body, used by create/delete endpoints and the subject
/// update endpoint (which deliberately does not echo the record back).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Canonical form of a username: surrounding whitespace removed, lowercased.
/// Applied on create, update, and login so that lookups and the unique index
/// all operate on the same representation.
pub fn normalize_username(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_username("  AliCE "), "alice");
        assert_eq!(normalize_username("AB"), "ab");
    }

    #[test]
    fn user_doc_serializes_with_mongo_field_names() {
        let doc = UserDoc {
            id: Uuid::new_v4(),
            first_name: "A".into(),
            last_name: "B".into(),
            username: "ab".into(),
            password: "$2b$12$hash".into(),
            created_at: Utc::now(),
        };
        let bson = bson::to_document(&doc).unwrap();
        assert!(bson.contains_key("_id"));
        assert!(bson.contains_key("firstName"));
        assert!(bson.contains_key("createdAt"));
    }

    #[test]
    fn summary_and_profile_strip_password() {
        let doc = UserDoc {
            id: Uuid::new_v4(),
            first_name: "A".into(),
            last_name: "B".into(),
            username: "ab".into(),
            password: "$2b$12$hash".into(),
            created_at: Utc::now(),
        };

        let summary = serde_json::to_value(UserSummary::from(doc.clone())).unwrap();
        assert!(summary.get("password").is_none());
        assert!(summary.get("firstName").is_none());

        let profile = serde_json::to_value(UserProfile::from(doc)).unwrap();
        assert!(profile.get("password").is_none());
        assert_eq!(profile["firstName"], "A");
    }
}
