//! PostgreSQL implementation for user repository.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use crate::error::{Result, ServerError};
use crate::user::{
    Field, Gender, Password, Projection, RecordId, User, UserFilter,
    UserRepository, UserUpdate,
};

/// PostgreSQL user repository.
///
/// Scalars are columns, sub-record lists are `JSONB`, profiles are
/// `TEXT[]`.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new [`PgUserRepository`].
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn internal(
    details: &str,
    err: impl std::error::Error + Send + Sync + 'static,
) -> ServerError {
    ServerError::Internal {
        details: details.to_owned(),
        source: Some(Box::new(err)),
    }
}

/// Only hashes reach the `password` column.
fn stored_hash(password: Option<&Password>) -> Result<Option<String>> {
    match password {
        Some(Password::Hashed(hash)) => Ok(Some(hash.clone())),
        Some(Password::Plain(_)) => Err(ServerError::Internal {
            details: "refusing to store a plaintext password".into(),
            source: None,
        }),
        None => Ok(None),
    }
}

/// Turn unique violations into [`ServerError::UniquenessConflict`].
fn map_write_error(
    err: sqlx::Error,
    id: Option<&str>,
    email: Option<&str>,
    tax_id: Option<&str>,
) -> ServerError {
    if let Some(db) = err.as_database_error() {
        if db.is_unique_violation() {
            let (field, value) = match db.constraint() {
                Some("users_email_key") => ("email", email),
                Some("users_tax_id_key") => ("taxId", tax_id),
                _ => ("id", id),
            };
            tracing::warn!(field, "unique constraint violated");

            return ServerError::UniquenessConflict {
                field,
                value: value.unwrap_or_default().to_owned(),
            };
        }
    }

    ServerError::Sql(err)
}

fn select_columns(projection: &Projection) -> String {
    projection
        .fields()
        .map(|field| field.column())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Read the projected columns of `row`.
fn from_row(row: &PgRow, projection: &Projection) -> Result<User> {
    let mut user = User::default();

    for field in projection.fields() {
        let column = field.column();
        match field {
            Field::Id => {
                let id: String = row.try_get(column)?;
                user.id = Some(
                    RecordId::parse(id)
                        .map_err(|err| internal("stored id is invalid", err))?,
                );
            },
            Field::GivenName => user.given_name = row.try_get(column)?,
            Field::FamilyName => user.family_name = row.try_get(column)?,
            Field::NationalId => user.national_id = row.try_get(column)?,
            Field::TaxId => user.tax_id = row.try_get(column)?,
            Field::Email => user.email = row.try_get(column)?,
            Field::BirthDate => user.birth_date = row.try_get(column)?,
            Field::Gender => {
                let gender: Option<String> = row.try_get(column)?;
                user.gender = gender
                    .map(|gender| gender.parse::<Gender>())
                    .transpose()
                    .map_err(|err| internal("stored gender is invalid", err))?;
            },
            Field::MaritalStatus => {
                user.marital_status = row.try_get(column)?
            },
            Field::Password => {
                let hash: String = row.try_get(column)?;
                user.password = Some(Password::Hashed(hash));
            },
            Field::Profiles => user.profiles = row.try_get(column)?,
            Field::PostalCode => user.postal_code = row.try_get(column)?,
            Field::Number => user.number = row.try_get(column)?,
            Field::Complement => user.complement = row.try_get(column)?,
            Field::Street => user.street = row.try_get(column)?,
            Field::District => user.district = row.try_get(column)?,
            Field::City => user.city = row.try_get(column)?,
            Field::State => user.state = row.try_get(column)?,
            Field::Contacts => {
                user.contacts = row.try_get::<Json<_>, _>(column)?.0
            },
            Field::Education => {
                user.education = row.try_get::<Json<_>, _>(column)?.0
            },
            Field::Experience => {
                user.experience = row.try_get::<Json<_>, _>(column)?.0
            },
            Field::Courses => {
                user.courses = row.try_get::<Json<_>, _>(column)?.0
            },
            Field::Languages => {
                user.languages = row.try_get::<Json<_>, _>(column)?.0
            },
            Field::Applications => {
                user.applications = row.try_get::<Json<_>, _>(column)?.0
            },
            Field::Bio => user.bio = row.try_get(column)?,
            Field::RecoveryCode => user.recovery_code = row.try_get(column)?,
        }
    }

    Ok(user)
}

/// Build `UPDATE users SET ... WHERE <filter>`.
///
/// Returns `None` when the payload is empty.
fn update_query(
    filter: &UserFilter,
    update: &UserUpdate,
) -> Result<Option<QueryBuilder<'static, Postgres>>> {
    if update.is_empty() {
        return Ok(None);
    }

    let mut query = QueryBuilder::new("UPDATE users SET ");
    let mut set = query.separated(", ");

    // column names are the field names.
    macro_rules! set_columns {
        ($($field:ident),* $(,)?) => {
            $(
                if let Some(value) = &update.$field {
                    set.push(concat!(stringify!($field), " = "));
                    set.push_bind_unseparated(value.clone());
                }
            )*
        };
    }
    macro_rules! set_json_columns {
        ($($field:ident),* $(,)?) => {
            $(
                if let Some(value) = &update.$field {
                    set.push(concat!(stringify!($field), " = "));
                    set.push_bind_unseparated(Json(value.clone()));
                }
            )*
        };
    }

    set_columns!(
        given_name,
        family_name,
        national_id,
        tax_id,
        email,
        birth_date,
        marital_status,
        profiles,
        postal_code,
        number,
        complement,
        street,
        district,
        city,
        state,
        bio,
        recovery_code,
    );
    set_json_columns!(
        contacts,
        education,
        experience,
        courses,
        languages,
        applications,
    );

    if let Some(gender) = update.gender {
        set.push("gender = ");
        set.push_bind_unseparated(gender.as_str());
    }
    if let Some(hash) = stored_hash(update.password.as_ref())? {
        set.push("password = ");
        set.push_bind_unseparated(hash);
    }

    query.push(format!(" WHERE {} = ", filter.field().column()));
    query.push_bind(filter.value().to_owned());

    Ok(Some(query))
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, user: &User) -> Result<()> {
        let id = user.id.as_ref().map(RecordId::to_string);
        let Some(password) = stored_hash(user.password.as_ref())? else {
            return Err(ServerError::Internal {
                details: "user inserted without password".into(),
                source: None,
            });
        };

        sqlx::query(
            r#"
            INSERT INTO users (
                id, given_name, family_name, national_id, tax_id,
                email, birth_date, gender, marital_status, password,
                profiles, postal_code, number, complement, street,
                district, city, state, contacts, education,
                experience, courses, languages, applications, bio,
                recovery_code
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26)
            "#,
        )
        .bind(&id)
        .bind(&user.given_name)
        .bind(&user.family_name)
        .bind(&user.national_id)
        .bind(&user.tax_id)
        .bind(&user.email)
        .bind(&user.birth_date)
        .bind(user.gender.map(|g| g.as_str()))
        .bind(&user.marital_status)
        .bind(password)
        .bind(&user.profiles)
        .bind(&user.postal_code)
        .bind(user.number)
        .bind(&user.complement)
        .bind(&user.street)
        .bind(&user.district)
        .bind(&user.city)
        .bind(&user.state)
        .bind(Json(&user.contacts))
        .bind(Json(&user.education))
        .bind(Json(&user.experience))
        .bind(Json(&user.courses))
        .bind(Json(&user.languages))
        .bind(Json(&user.applications))
        .bind(&user.bio)
        .bind(user.recovery_code)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            map_write_error(
                err,
                id.as_deref(),
                Some(&user.email),
                user.tax_id.as_deref(),
            )
        })?;

        Ok(())
    }

    async fn replace(&self, user: &User) -> Result<bool> {
        let id = user.id.as_ref().map(RecordId::to_string);
        let password = stored_hash(user.password.as_ref())?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET
                given_name = $2,
                family_name = $3,
                national_id = $4,
                tax_id = $5,
                email = $6,
                birth_date = $7,
                gender = $8,
                marital_status = $9,
                password = COALESCE($10, password),
                profiles = $11,
                postal_code = $12,
                number = $13,
                complement = $14,
                street = $15,
                district = $16,
                city = $17,
                state = $18,
                contacts = $19,
                education = $20,
                experience = $21,
                courses = $22,
                languages = $23,
                applications = $24,
                bio = $25,
                recovery_code = $26
            WHERE id = $1
            "#,
        )
        .bind(&id)
        .bind(&user.given_name)
        .bind(&user.family_name)
        .bind(&user.national_id)
        .bind(&user.tax_id)
        .bind(&user.email)
        .bind(&user.birth_date)
        .bind(user.gender.map(|g| g.as_str()))
        .bind(&user.marital_status)
        .bind(password)
        .bind(&user.profiles)
        .bind(&user.postal_code)
        .bind(user.number)
        .bind(&user.complement)
        .bind(&user.street)
        .bind(&user.district)
        .bind(&user.city)
        .bind(&user.state)
        .bind(Json(&user.contacts))
        .bind(Json(&user.education))
        .bind(Json(&user.experience))
        .bind(Json(&user.courses))
        .bind(Json(&user.languages))
        .bind(Json(&user.applications))
        .bind(&user.bio)
        .bind(user.recovery_code)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            map_write_error(
                err,
                id.as_deref(),
                Some(&user.email),
                user.tax_id.as_deref(),
            )
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_one(
        &self,
        filter: &UserFilter,
        projection: &Projection,
    ) -> Result<Option<User>> {
        let query = format!(
            "SELECT {} FROM users WHERE {} = $1 LIMIT 1",
            select_columns(projection),
            filter.field().column(),
        );

        let row = sqlx::query(&query)
            .bind(filter.value())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| from_row(&row, projection)).transpose()
    }

    async fn find_one_and_update(
        &self,
        filter: &UserFilter,
        update: &UserUpdate,
        projection: &Projection,
    ) -> Result<Option<User>> {
        let Some(mut query) = update_query(filter, update)? else {
            return self.find_one(filter, projection).await;
        };

        query.push(format!(" RETURNING {}", select_columns(projection)));

        let row = query
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| {
                map_write_error(
                    err,
                    None,
                    update.email.as_deref(),
                    update.tax_id.as_deref(),
                )
            })?;

        row.map(|row| from_row(&row, projection)).transpose()
    }

    async fn update(
        &self,
        filter: &UserFilter,
        update: &UserUpdate,
    ) -> Result<u64> {
        let Some(mut query) = update_query(filter, update)? else {
            return Ok(0);
        };

        let result = query
            .build()
            .execute(&self.pool)
            .await
            .map_err(|err| {
                map_write_error(
                    err,
                    None,
                    update.email.as_deref(),
                    update.tax_id.as_deref(),
                )
            })?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, filter: &UserFilter) -> Result<u64> {
        let query = format!(
            "DELETE FROM users WHERE {} = $1",
            filter.field().column()
        );

        let result = sqlx::query(&query)
            .bind(filter.value())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::Contact;

    fn user(email: &str, tax_id: Option<&str>) -> User {
        User {
            id: Some(RecordId::generate()),
            given_name: "Maria".into(),
            family_name: "Souza".into(),
            email: email.into(),
            tax_id: tax_id.map(Into::into),
            gender: Some(Gender::Female),
            password: Some(Password::Hashed("$argon2id$stored".into())),
            profiles: vec!["user".into()],
            contacts: vec![Contact {
                kind: "phone".into(),
                value: "+55 81 99999-0000".into(),
                verified: true,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_select_columns() {
        let projection = Projection::include([Field::Email, Field::TaxId]);
        assert_eq!(select_columns(&projection), "id, tax_id, email");

        assert!(!select_columns(&Projection::default()).contains("password"));
    }

    #[test]
    fn test_update_query() {
        let filter = UserFilter::Email("x@example.com".into());
        let update = UserUpdate {
            given_name: Some("Joana".into()),
            gender: Some(Gender::Other),
            password: Some(Password::Hashed("$argon2id$new".into())),
            ..Default::default()
        };

        let query = update_query(&filter, &update).unwrap().unwrap();
        assert_eq!(
            query.sql(),
            "UPDATE users SET given_name = $1, gender = $2, password = $3 WHERE email = $4"
        );

        assert!(update_query(&filter, &UserUpdate::default()).unwrap().is_none());
    }

    #[test]
    fn test_update_query_rejects_plaintext() {
        let filter = UserFilter::Email("x@example.com".into());
        let update = UserUpdate::default().password("plaintext");

        assert!(matches!(
            update_query(&filter, &update),
            Err(ServerError::Internal { .. })
        ));
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL instance (DATABASE_URL)"]
    async fn test_insert_and_find(pool: PgPool) {
        let repo = PgUserRepository::new(pool);
        let stored = user("x@example.com", Some("529.982.247-25"));
        repo.insert(&stored).await.unwrap();

        let found = repo
            .find_one(
                &UserFilter::TaxId("529.982.247-25".into()),
                &Projection::default(),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.email, "x@example.com");
        assert_eq!(found.contacts, stored.contacts);
        assert!(found.password.is_none());

        let err = repo
            .insert(&user("x@example.com", None))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServerError::UniquenessConflict { field: "email", .. }
        ));
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL instance (DATABASE_URL)"]
    async fn test_find_one_and_update(pool: PgPool) {
        let repo = PgUserRepository::new(pool);
        repo.insert(&user("x@example.com", None)).await.unwrap();

        let filter = UserFilter::Email("x@example.com".into());
        let update = UserUpdate {
            city: Some("Recife".into()),
            ..Default::default()
        };
        let updated = repo
            .find_one_and_update(&filter, &update, &Projection::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.city.as_deref(), Some("Recife"));

        let missing = UserFilter::Email("y@example.com".into());
        assert_eq!(repo.update(&missing, &update).await.unwrap(), 0);
        assert_eq!(repo.delete(&filter).await.unwrap(), 1);
    }
}
