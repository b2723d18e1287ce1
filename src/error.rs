use thiserror::Error;

/// Failures raised by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("mongodb error: {0}")]
    Mongo(#[from] mongodb::error::Error),
    #[error("could not encode record: {0}")]
    Serialize(#[from] bson::ser::Error),
    #[error("could not decode record: {0}")]
    Deserialize(#[from] bson::de::Error),
    #[error("write attempted on a read-only transaction")]
    ReadOnly,
}

/// Errors surfaced by the listing services.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("validation failed: {0}")]
    ValidationFailed(String),
    #[error("hospitality listing {listing_id} of property {property_id} vanished during sync")]
    ConflictDuringSync {
        property_id: String,
        listing_id: String,
    },
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl ServiceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ServiceError::NotFound(what.into())
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        ServiceError::Forbidden(reason.into())
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        ServiceError::ValidationFailed(reason.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound(_))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
