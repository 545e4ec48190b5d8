//! Field selection on reads.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::mem::take;
use std::str::FromStr;

use serde::Deserialize;

use crate::user::User;

/// Every top-level field of a [`User`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Id,
    GivenName,
    FamilyName,
    NationalId,
    TaxId,
    Email,
    BirthDate,
    Gender,
    MaritalStatus,
    Password,
    Profiles,
    PostalCode,
    Number,
    Complement,
    Street,
    District,
    City,
    State,
    Contacts,
    Education,
    Experience,
    Courses,
    Languages,
    Applications,
    Bio,
    RecoveryCode,
}

impl Field {
    pub const ALL: [Field; 26] = [
        Field::Id,
        Field::GivenName,
        Field::FamilyName,
        Field::NationalId,
        Field::TaxId,
        Field::Email,
        Field::BirthDate,
        Field::Gender,
        Field::MaritalStatus,
        Field::Password,
        Field::Profiles,
        Field::PostalCode,
        Field::Number,
        Field::Complement,
        Field::Street,
        Field::District,
        Field::City,
        Field::State,
        Field::Contacts,
        Field::Education,
        Field::Experience,
        Field::Courses,
        Field::Languages,
        Field::Applications,
        Field::Bio,
        Field::RecoveryCode,
    ];

    /// Document key, as serialized.
    pub fn key(&self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::GivenName => "givenName",
            Field::FamilyName => "familyName",
            Field::NationalId => "nationalId",
            Field::TaxId => "taxId",
            Field::Email => "email",
            Field::BirthDate => "birthDate",
            Field::Gender => "gender",
            Field::MaritalStatus => "maritalStatus",
            Field::Password => "password",
            Field::Profiles => "profiles",
            Field::PostalCode => "postalCode",
            Field::Number => "number",
            Field::Complement => "complement",
            Field::Street => "street",
            Field::District => "district",
            Field::City => "city",
            Field::State => "state",
            Field::Contacts => "contacts",
            Field::Education => "education",
            Field::Experience => "experience",
            Field::Courses => "courses",
            Field::Languages => "languages",
            Field::Applications => "applications",
            Field::Bio => "bio",
            Field::RecoveryCode => "recoveryCode",
        }
    }

    /// Column name on the `users` table.
    pub fn column(&self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::GivenName => "given_name",
            Field::FamilyName => "family_name",
            Field::NationalId => "national_id",
            Field::TaxId => "tax_id",
            Field::Email => "email",
            Field::BirthDate => "birth_date",
            Field::Gender => "gender",
            Field::MaritalStatus => "marital_status",
            Field::Password => "password",
            Field::Profiles => "profiles",
            Field::PostalCode => "postal_code",
            Field::Number => "number",
            Field::Complement => "complement",
            Field::Street => "street",
            Field::District => "district",
            Field::City => "city",
            Field::State => "state",
            Field::Contacts => "contacts",
            Field::Education => "education",
            Field::Experience => "experience",
            Field::Courses => "courses",
            Field::Languages => "languages",
            Field::Applications => "applications",
            Field::Bio => "bio",
            Field::RecoveryCode => "recovery_code",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ProjectionError {
    #[error("unknown field `{0}`")]
    UnknownField(String),
    #[error("cannot mix inclusion and exclusion in a projection")]
    Mixed,
}

impl FromStr for Field {
    type Err = ProjectionError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|field| field.key() == key)
            .ok_or_else(|| ProjectionError::UnknownField(key.to_owned()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    Include(BTreeSet<Field>),
    Exclude(BTreeSet<Field>),
}

/// Which fields a read returns.
///
/// The password is never returned unless explicitly included.
///
/// Deserializes from a document such as `{"password": 0}` or
/// `{"email": 1, "profiles": 1}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "BTreeMap<String, i64>")]
pub struct Projection(Mode);

impl Default for Projection {
    fn default() -> Self {
        Self(Mode::Exclude(BTreeSet::new()))
    }
}

impl Projection {
    /// Return only `fields`, plus the id.
    pub fn include(fields: impl IntoIterator<Item = Field>) -> Self {
        let mut fields: BTreeSet<Field> = fields.into_iter().collect();
        fields.insert(Field::Id);
        Self(Mode::Include(fields))
    }

    /// Return everything but `fields`.
    pub fn exclude(fields: impl IntoIterator<Item = Field>) -> Self {
        Self(Mode::Exclude(fields.into_iter().collect()))
    }

    /// Whether `field` is returned by this projection.
    pub fn contains(&self, field: Field) -> bool {
        match &self.0 {
            Mode::Include(fields) => fields.contains(&field),
            Mode::Exclude(fields) => {
                field != Field::Password && !fields.contains(&field)
            },
        }
    }

    /// Selected fields, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        Field::ALL.into_iter().filter(|field| self.contains(*field))
    }

    /// Reset every field outside the projection to its default value.
    pub fn apply(&self, mut user: User) -> User {
        let mut projected = User::default();

        for field in self.fields() {
            match field {
                Field::Id => projected.id = take(&mut user.id),
                Field::GivenName => projected.given_name = take(&mut user.given_name),
                Field::FamilyName => projected.family_name = take(&mut user.family_name),
                Field::NationalId => projected.national_id = take(&mut user.national_id),
                Field::TaxId => projected.tax_id = take(&mut user.tax_id),
                Field::Email => projected.email = take(&mut user.email),
                Field::BirthDate => projected.birth_date = take(&mut user.birth_date),
                Field::Gender => projected.gender = user.gender,
                Field::MaritalStatus => projected.marital_status = take(&mut user.marital_status),
                Field::Password => projected.password = take(&mut user.password),
                Field::Profiles => projected.profiles = take(&mut user.profiles),
                Field::PostalCode => projected.postal_code = take(&mut user.postal_code),
                Field::Number => projected.number = user.number,
                Field::Complement => projected.complement = take(&mut user.complement),
                Field::Street => projected.street = take(&mut user.street),
                Field::District => projected.district = take(&mut user.district),
                Field::City => projected.city = take(&mut user.city),
                Field::State => projected.state = take(&mut user.state),
                Field::Contacts => projected.contacts = take(&mut user.contacts),
                Field::Education => projected.education = take(&mut user.education),
                Field::Experience => projected.experience = take(&mut user.experience),
                Field::Courses => projected.courses = take(&mut user.courses),
                Field::Languages => projected.languages = take(&mut user.languages),
                Field::Applications => projected.applications = take(&mut user.applications),
                Field::Bio => projected.bio = take(&mut user.bio),
                Field::RecoveryCode => projected.recovery_code = user.recovery_code,
            }
        }

        projected
    }
}

impl TryFrom<BTreeMap<String, i64>> for Projection {
    type Error = ProjectionError;

    fn try_from(document: BTreeMap<String, i64>) -> Result<Self, Self::Error> {
        let mut included = BTreeSet::new();
        let mut excluded = BTreeSet::new();

        for (key, flag) in document {
            let field = key.parse::<Field>()?;
            if flag == 0 {
                excluded.insert(field);
            } else {
                included.insert(field);
            }
        }

        // `id` comes with inclusions unless explicitly excluded.
        if !included.is_empty() && !excluded.remove(&Field::Id) {
            included.insert(Field::Id);
        }

        match (included.is_empty(), excluded.is_empty()) {
            (true, _) => Ok(Self(Mode::Exclude(excluded))),
            (false, true) => Ok(Self(Mode::Include(included))),
            (false, false) => Err(ProjectionError::Mixed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projection(json: &str) -> Result<Projection, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn test_default_hides_password() {
        let projection = Projection::default();

        assert!(!projection.contains(Field::Password));
        assert!(projection.contains(Field::Email));
        assert_eq!(projection.fields().count(), Field::ALL.len() - 1);
    }

    #[test]
    fn test_exclusion_document() {
        let projection = projection(r#"{"password": 0, "bio": 0}"#).unwrap();

        assert!(!projection.contains(Field::Password));
        assert!(!projection.contains(Field::Bio));
        assert!(projection.contains(Field::GivenName));
    }

    #[test]
    fn test_inclusion_document() {
        let projection = projection(r#"{"email": 1, "profiles": 1}"#).unwrap();

        assert_eq!(
            projection.fields().collect::<Vec<_>>(),
            vec![Field::Id, Field::Email, Field::Profiles]
        );
    }

    #[test]
    fn test_explicit_password_inclusion() {
        let projection = Projection::include([Field::Email, Field::Password]);
        assert!(projection.contains(Field::Password));
    }

    #[test]
    fn test_invalid_documents() {
        assert!(projection(r#"{"email": 1, "bio": 0}"#).is_err());
        assert!(projection(r#"{"nome": 1}"#).is_err());
        // `id` exclusion is allowed alongside inclusions.
        let projection = projection(r#"{"email": 1, "id": 0}"#).unwrap();
        assert_eq!(projection.fields().collect::<Vec<_>>(), vec![Field::Email]);
    }

    #[test]
    fn test_apply() {
        let user = User {
            email: "x@example.com".into(),
            given_name: "Maria".into(),
            password: Some(crate::user::Password::Hashed("hash".into())),
            ..Default::default()
        };

        let projected = Projection::include([Field::Email]).apply(user.clone());
        assert_eq!(projected.email, "x@example.com");
        assert!(projected.given_name.is_empty());
        assert!(projected.password.is_none());

        let projected = Projection::default().apply(user);
        assert_eq!(projected.given_name, "Maria");
        assert!(projected.password.is_none());
    }

    #[test]
    fn test_field_keys_roundtrip() {
        for field in Field::ALL {
            assert_eq!(field.key().parse::<Field>().unwrap(), field);
        }
    }
}
