//! Identity port between the service layer and the storage.

use async_trait::async_trait;

use crate::error::Result;
use crate::user::{Field, Projection, RecordId, User, UserUpdate};

/// Unique key selecting at most one [`User`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserFilter {
    Id(RecordId),
    Email(String),
    TaxId(String),
}

impl UserFilter {
    /// Field matched by this filter.
    pub fn field(&self) -> Field {
        match self {
            UserFilter::Id(_) => Field::Id,
            UserFilter::Email(_) => Field::Email,
            UserFilter::TaxId(_) => Field::TaxId,
        }
    }

    /// Value matched by this filter.
    pub fn value(&self) -> &str {
        match self {
            UserFilter::Id(id) => id.as_str(),
            UserFilter::Email(email) => email,
            UserFilter::TaxId(tax_id) => tax_id,
        }
    }

    /// Whether `user` matches this filter.
    pub fn matches(&self, user: &User) -> bool {
        match self {
            UserFilter::Id(id) => user.id.as_ref() == Some(id),
            UserFilter::Email(email) => user.email == *email,
            UserFilter::TaxId(tax_id) => {
                user.tax_id.as_deref() == Some(tax_id.as_str())
            },
        }
    }
}

/// Port for user persistence.
///
/// Implementations store what they receive: validation and password
/// hashing happen before, in [`crate::user::UserService`].
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. `user.id` must be set.
    async fn insert(&self, user: &User) -> Result<()>;

    /// Overwrite a stored user, keeping the stored password when
    /// `user.password` is `None`. Returns `false` if no user has this id.
    async fn replace(&self, user: &User) -> Result<bool>;

    async fn find_one(
        &self,
        filter: &UserFilter,
        projection: &Projection,
    ) -> Result<Option<User>>;

    /// Apply `update` and return the updated user.
    async fn find_one_and_update(
        &self,
        filter: &UserFilter,
        update: &UserUpdate,
        projection: &Projection,
    ) -> Result<Option<User>>;

    /// Apply `update`, returning the number of modified users.
    async fn update(
        &self,
        filter: &UserFilter,
        update: &UserUpdate,
    ) -> Result<u64>;

    async fn delete(&self, filter: &UserFilter) -> Result<u64>;
}
