//! In-process user storage.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Result, ServerError};
use crate::user::{
    Password, Projection, User, UserFilter, UserRepository, UserUpdate,
};

/// User repository kept in memory.
///
/// Enforces the same unique keys as the `users` table: `email` and, when
/// present, `tax_id`.
#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    users: RwLock<Vec<User>>,
}

impl MemoryUserRepository {
    /// Create a new [`MemoryUserRepository`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

/// Only hashes are stored.
fn refuse_plaintext(password: Option<&Password>) -> Result<()> {
    match password {
        Some(Password::Plain(_)) => Err(ServerError::Internal {
            details: "refusing to store a plaintext password".into(),
            source: None,
        }),
        _ => Ok(()),
    }
}

/// Reject `candidate` if it collides with any user but the one at `skip`.
fn check_unique(
    users: &[User],
    candidate: &User,
    skip: Option<usize>,
) -> Result<()> {
    for (index, user) in users.iter().enumerate() {
        if Some(index) == skip {
            continue;
        }

        if user.email == candidate.email {
            tracing::warn!(field = "email", "unique constraint violated");
            return Err(ServerError::UniquenessConflict {
                field: "email",
                value: candidate.email.clone(),
            });
        }

        if let (Some(stored), Some(tax_id)) = (&user.tax_id, &candidate.tax_id)
        {
            if stored == tax_id {
                tracing::warn!(field = "taxId", "unique constraint violated");
                return Err(ServerError::UniquenessConflict {
                    field: "taxId",
                    value: tax_id.clone(),
                });
            }
        }
    }

    Ok(())
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn insert(&self, user: &User) -> Result<()> {
        refuse_plaintext(user.password.as_ref())?;
        let mut users = self.users.write().await;

        if let Some(id) = &user.id {
            if users.iter().any(|u| u.id.as_ref() == Some(id)) {
                tracing::warn!(field = "id", "unique constraint violated");
                return Err(ServerError::UniquenessConflict {
                    field: "id",
                    value: id.to_string(),
                });
            }
        }
        check_unique(&users, user, None)?;

        users.push(user.clone());
        Ok(())
    }

    async fn replace(&self, user: &User) -> Result<bool> {
        refuse_plaintext(user.password.as_ref())?;
        let mut users = self.users.write().await;

        let Some(index) = users.iter().position(|u| u.id == user.id) else {
            return Ok(false);
        };
        check_unique(&users, user, Some(index))?;

        let mut stored = user.clone();
        if stored.password.is_none() {
            stored.password = users[index].password.take();
        }
        users[index] = stored;

        Ok(true)
    }

    async fn find_one(
        &self,
        filter: &UserFilter,
        projection: &Projection,
    ) -> Result<Option<User>> {
        let users = self.users.read().await;

        Ok(users
            .iter()
            .find(|user| filter.matches(user))
            .map(|user| projection.apply(user.clone())))
    }

    async fn find_one_and_update(
        &self,
        filter: &UserFilter,
        update: &UserUpdate,
        projection: &Projection,
    ) -> Result<Option<User>> {
        refuse_plaintext(update.password.as_ref())?;
        let mut users = self.users.write().await;

        let Some(index) = users.iter().position(|user| filter.matches(user))
        else {
            return Ok(None);
        };

        let mut updated = users[index].clone();
        update.apply_to(&mut updated);
        check_unique(&users, &updated, Some(index))?;
        users[index] = updated.clone();

        Ok(Some(projection.apply(updated)))
    }

    async fn update(
        &self,
        filter: &UserFilter,
        update: &UserUpdate,
    ) -> Result<u64> {
        if update.is_empty() {
            return Ok(0);
        }

        let found = self
            .find_one_and_update(filter, update, &Projection::default())
            .await?;

        Ok(found.map_or(0, |_| 1))
    }

    async fn delete(&self, filter: &UserFilter) -> Result<u64> {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|user| !filter.matches(user));

        Ok((before - users.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::{Field, RecordId};

    fn user(email: &str, tax_id: Option<&str>) -> User {
        User {
            id: Some(RecordId::generate()),
            given_name: "Maria".into(),
            family_name: "Souza".into(),
            email: email.into(),
            tax_id: tax_id.map(Into::into),
            password: Some(Password::Hashed("$argon2id$stored".into())),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_unique_email() {
        let repo = MemoryUserRepository::new();
        repo.insert(&user("x@example.com", None)).await.unwrap();

        let err = repo
            .insert(&user("x@example.com", None))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServerError::UniquenessConflict { field: "email", .. }
        ));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_unique_tax_id() {
        let repo = MemoryUserRepository::new();
        repo.insert(&user("a@example.com", Some("529.982.247-25")))
            .await
            .unwrap();
        // users without tax id never collide.
        repo.insert(&user("b@example.com", None)).await.unwrap();
        repo.insert(&user("c@example.com", None)).await.unwrap();

        let err = repo
            .insert(&user("d@example.com", Some("529.982.247-25")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServerError::UniquenessConflict { field: "taxId", .. }
        ));
    }

    #[tokio::test]
    async fn test_replace_keeps_password() {
        let repo = MemoryUserRepository::new();
        let mut stored = user("x@example.com", None);
        repo.insert(&stored).await.unwrap();

        stored.password = None;
        stored.city = Some("Recife".into());
        assert!(repo.replace(&stored).await.unwrap());

        let found = repo
            .find_one(
                &UserFilter::Email("x@example.com".into()),
                &Projection::include([Field::Password, Field::City]),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.city.as_deref(), Some("Recife"));
        assert_eq!(
            found.password,
            Some(Password::Hashed("$argon2id$stored".into()))
        );
    }

    #[tokio::test]
    async fn test_update_conflict_leaves_record() {
        let repo = MemoryUserRepository::new();
        repo.insert(&user("a@example.com", None)).await.unwrap();
        repo.insert(&user("b@example.com", None)).await.unwrap();

        let update = UserUpdate {
            email: Some("a@example.com".into()),
            ..Default::default()
        };
        let filter = UserFilter::Email("b@example.com".into());
        assert!(repo.update(&filter, &update).await.is_err());
        assert!(
            repo.find_one(&filter, &Projection::default())
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_plaintext_is_refused() {
        let repo = MemoryUserRepository::new();
        let mut plain = user("x@example.com", None);
        plain.password = Some(Password::Plain("hunter22".into()));

        assert!(matches!(
            repo.insert(&plain).await,
            Err(ServerError::Internal { .. })
        ));
        assert!(repo.is_empty().await);

        repo.insert(&user("x@example.com", None)).await.unwrap();
        let update = UserUpdate::default().password("hunter22");
        let filter = UserFilter::Email("x@example.com".into());
        assert!(repo.update(&filter, &update).await.is_err());

        let found = repo
            .find_one(&filter, &Projection::include([Field::Password]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            found.password,
            Some(Password::Hashed("$argon2id$stored".into()))
        );
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = MemoryUserRepository::new();
        repo.insert(&user("x@example.com", None)).await.unwrap();

        let filter = UserFilter::Email("x@example.com".into());
        assert_eq!(repo.delete(&filter).await.unwrap(), 1);
        assert_eq!(repo.delete(&filter).await.unwrap(), 0);
        assert!(repo.is_empty().await);
    }
}
