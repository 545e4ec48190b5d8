use std::sync::Arc;

use validator::{Validate, ValidationError, ValidationErrors};

use crate::crypto::{self, PasswordHasher};
use crate::error::{Result, ServerError};
use crate::user::{
    Password, Projection, RecordId, User, UserFilter, UserRepository,
    UserUpdate,
};

fn password_error(
    code: &'static str,
    message: &'static str,
) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.add(
        "password",
        ValidationError::new(code).with_message(message.into()),
    );
    errors
}

/// Replace a plaintext password by its hash.
///
/// A `Hashed` value must already be a PHC string. Returns whether hashing
/// happened.
async fn hash_in_place(
    hasher: &dyn PasswordHasher,
    password: &mut Option<Password>,
) -> Result<bool> {
    match password {
        Some(Password::Plain(plain)) => {
            let hash = hasher.hash(plain).await?;
            *password = Some(Password::Hashed(hash));
            Ok(true)
        },
        Some(Password::Hashed(hash)) => {
            if crypto::check_phc(hash).is_err() {
                tracing::warn!("password hash is not a PHC string");
                return Err(
                    password_error("phc", "password hash is malformed.").into()
                );
            }
            Ok(false)
        },
        None => Ok(false),
    }
}

/// User manager.
///
/// Every write goes through validation then the hashing hook before
/// reaching the repository.
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
}

impl UserService {
    /// Create a new [`UserService`].
    pub fn new(
        repo: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self { repo, hasher }
    }

    /// Hook run before a user is inserted or replaced.
    ///
    /// A password that is already hashed is left untouched.
    pub async fn before_save(&self, user: &mut User) -> Result<()> {
        if user.id.is_none() && user.password.is_none() {
            return Err(password_error(
                "required",
                "Missing 'password' field.",
            )
            .into());
        }

        if hash_in_place(self.hasher.as_ref(), &mut user.password).await? {
            tracing::debug!(user_id = ?user.id, "password hashed before save");
        }

        Ok(())
    }

    /// Hook run before an update payload is applied.
    pub async fn before_update(&self, update: &mut UserUpdate) -> Result<()> {
        if hash_in_place(self.hasher.as_ref(), &mut update.password).await? {
            tracing::debug!("password hashed before update");
        }

        Ok(())
    }

    /// Insert `user`, or replace it when it already has an id.
    ///
    /// On success `user` holds its id and the password hash.
    pub async fn save(&self, user: &mut User) -> Result<()> {
        user.validate()?;
        self.before_save(user).await?;

        match &user.id {
            Some(id) => {
                if !self.repo.replace(user).await? {
                    return Err(ServerError::UserNotFound(id.to_string()));
                }
                tracing::debug!(user_id = %id, "user replaced");
            },
            None => {
                let id = RecordId::generate();
                user.id = Some(id.clone());

                if let Err(err) = self.repo.insert(user).await {
                    user.id = None;
                    return Err(err);
                }
                tracing::debug!(user_id = %id, "user inserted");
            },
        }

        Ok(())
    }

    /// Apply `update` on the user selected by `filter`, returning it updated.
    pub async fn find_one_and_update(
        &self,
        filter: &UserFilter,
        mut update: UserUpdate,
        projection: &Projection,
    ) -> Result<Option<User>> {
        update.validate()?;
        self.before_update(&mut update).await?;

        self.repo
            .find_one_and_update(filter, &update, projection)
            .await
    }

    /// Apply `update` on the user selected by `filter`.
    ///
    /// Returns the number of modified users.
    pub async fn update(
        &self,
        filter: &UserFilter,
        mut update: UserUpdate,
    ) -> Result<u64> {
        update.validate()?;
        self.before_update(&mut update).await?;

        self.repo.update(filter, &update).await
    }

    pub async fn delete(&self, filter: &UserFilter) -> Result<u64> {
        self.repo.delete(filter).await
    }

    /// Find a user using `email` field.
    pub async fn find_by_email(
        &self,
        email: impl Into<String>,
        projection: &Projection,
    ) -> Result<Option<User>> {
        self.repo
            .find_one(&UserFilter::Email(email.into()), projection)
            .await
    }

    /// Find a user using `tax_id` field.
    pub async fn find_by_tax_id(
        &self,
        tax_id: impl Into<String>,
        projection: &Projection,
    ) -> Result<Option<User>> {
        self.repo
            .find_one(&UserFilter::TaxId(tax_id.into()), projection)
            .await
    }

    /// Find a user using `id` field.
    pub async fn find_by_id(
        &self,
        id: &RecordId,
        projection: &Projection,
    ) -> Result<Option<User>> {
        self.repo
            .find_one(&UserFilter::Id(id.clone()), projection)
            .await
    }
}
