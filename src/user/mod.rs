mod builder;
mod id;
mod memory;
mod postgres;
mod projection;
mod repository;
mod service;
mod update;
pub mod validation;

pub use builder::*;
pub use id::*;
pub use memory::*;
pub use postgres::*;
pub use projection::*;
pub use repository::*;
pub use service::*;
pub use update::*;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

use crate::crypto::{self, CryptoError};

/// Stored credential of a [`User`].
///
/// A `Plain` password only lives between the caller and the hashing hook.
#[derive(Clone, PartialEq, Eq)]
pub enum Password {
    Plain(String),
    Hashed(String),
}

impl Password {
    /// Wrap an existing PHC string, refusing anything else.
    pub fn from_phc(hash: impl Into<String>) -> Result<Self, CryptoError> {
        let hash = hash.into();
        crypto::check_phc(&hash)?;
        Ok(Password::Hashed(hash))
    }

    /// Returns the PHC string when the password is hashed.
    pub fn hash(&self) -> Option<&str> {
        match self {
            Password::Hashed(hash) => Some(hash),
            Password::Plain(_) => None,
        }
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Password::Plain(_) => "Plain",
            Password::Hashed(_) => "Hashed",
        };
        f.debug_tuple(kind).field(&"[REDACTED]").finish()
    }
}

/// Incoming passwords are always plaintext.
impl<'de> Deserialize<'de> for Password {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Password::Plain)
    }
}

/// Declared gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
    Unspecified,
}

impl Gender {
    /// Label used on storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
            Gender::Unspecified => "Unspecified",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Male" => Ok(Gender::Male),
            "Female" => Ok(Gender::Female),
            "Other" => Ok(Gender::Other),
            "Unspecified" => Ok(Gender::Unspecified),
            _ => Err(ValidationError::new("enum").with_message(
                format!(
                    "gender: `{value}` is not one of Male, Female, Other, Unspecified"
                )
                .into(),
            )),
        }
    }
}

/// Ways to reach a [`User`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct Contact {
    #[serde(rename = "type")]
    #[validate(length(min = 1, message = "type is required."))]
    pub kind: String,
    #[validate(length(min = 1, message = "value is required."))]
    pub value: String,
    pub verified: bool,
}

/// Formal education entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct Education {
    #[validate(length(min = 1, message = "institution is required."))]
    pub institution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    #[validate(length(min = 1, message = "level is required."))]
    pub level: String,
    #[validate(length(min = 1, message = "status is required."))]
    pub status: String,
}

/// Professional experience entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    #[validate(length(min = 1, message = "company is required."))]
    pub company: String,
    #[validate(length(min = 1, message = "role is required."))]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    pub current: bool,
    #[validate(length(min = 1, message = "description is required."))]
    pub description: String,
}

/// Extra course, outside formal education.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct Course {
    #[validate(length(min = 1, message = "name is required."))]
    pub name: String,
    #[validate(length(min = 1, message = "institution is required."))]
    pub institution: String,
}

/// Spoken language.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct Language {
    #[validate(length(min = 1, message = "language is required."))]
    pub language: String,
    #[validate(length(min = 1, message = "level is required."))]
    pub level: String,
    #[validate(length(min = 1, message = "flag is required."))]
    pub flag: String,
}

/// Application of a [`User`] to a job.
///
/// `job_id` references a job owned by another service and is not checked.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[validate(length(min = 1, message = "applicationDate is required."))]
    pub application_date: String,
    pub approved: bool,
    pub rejected: bool,
    #[validate(length(min = 1, message = "interviewStage is required."))]
    pub interview_stage: String,
    pub job_id: RecordId,
}

/// User as saved on database.
///
/// Reads only fill the fields selected by their [`Projection`], the others
/// are left to their default value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[validate(length(
        min = 3,
        max = 100,
        message = "givenName must contain between 3 and 100 characters."
    ))]
    pub given_name: String,
    #[validate(length(
        min = 3,
        max = 100,
        message = "familyName must contain between 3 and 100 characters."
    ))]
    pub family_name: String,
    #[validate(length(
        min = 3,
        max = 14,
        message = "nationalId must contain between 3 and 14 characters."
    ))]
    #[serde(default)]
    pub national_id: Option<String>,
    #[validate(custom(function = "validation::validate_tax_id"))]
    #[serde(default)]
    pub tax_id: Option<String>,
    #[validate(custom(function = "validation::validate_email"))]
    pub email: String,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub marital_status: Option<String>,
    #[serde(skip)]
    pub password: Option<Password>,
    #[serde(default)]
    pub profiles: Vec<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub number: Option<i32>,
    #[serde(default)]
    pub complement: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[validate(nested)]
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[validate(nested)]
    #[serde(default)]
    pub education: Vec<Education>,
    #[validate(nested)]
    #[serde(default)]
    pub experience: Vec<Experience>,
    #[validate(nested)]
    #[serde(default)]
    pub courses: Vec<Course>,
    #[validate(nested)]
    #[serde(default)]
    pub languages: Vec<Language>,
    #[validate(nested)]
    #[serde(default)]
    pub applications: Vec<Application>,
    #[validate(length(
        min = 50,
        max = 500,
        message = "bio must contain between 50 and 500 characters."
    ))]
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub recovery_code: Option<i64>,
}

impl User {
    /// Create a [`UserBuilder`].
    pub fn builder() -> UserBuilder<Missing, Missing> {
        UserBuilder::new()
    }

    /// Compare a plaintext candidate with the stored hash.
    ///
    /// A wrong password is `Ok(false)`. Errors only when there is no hash to
    /// compare against: password not selected, not yet hashed, or malformed.
    pub fn matches(&self, candidate: impl AsRef<[u8]>) -> Result<bool, CryptoError> {
        match &self.password {
            Some(Password::Hashed(hash)) => {
                crypto::verify_password(candidate, hash)
            },
            Some(Password::Plain(_)) => Err(CryptoError::NotHashed),
            None => Err(CryptoError::MissingHash),
        }
    }

    /// Check whether the user holds at least one of `roles`.
    pub fn has_any<I, S>(&self, roles: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        roles
            .into_iter()
            .any(|role| self.profiles.iter().any(|p| p == role.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::tests::fast_manager;

    fn with_profiles(profiles: &[&str]) -> User {
        User {
            profiles: profiles.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_has_any() {
        assert!(with_profiles(&["user", "admin"]).has_any(["admin"]));
        assert!(!with_profiles(&["user"]).has_any(["admin"]));
        assert!(with_profiles(&["user"]).has_any(["admin", "user"]));
        assert!(!with_profiles(&[]).has_any(["user"]));
        assert!(!with_profiles(&["user"]).has_any(Vec::<String>::new()));
    }

    #[test]
    fn test_matches() {
        let hash = fast_manager().hash_password("correct horse").unwrap();
        let user = User {
            password: Some(Password::Hashed(hash)),
            ..Default::default()
        };

        assert!(user.matches("correct horse").unwrap());
        assert!(!user.matches("battery staple").unwrap());
    }

    #[test]
    fn test_matches_without_hash() {
        let user = User::default();
        assert!(matches!(user.matches("x"), Err(CryptoError::MissingHash)));

        let user = User {
            password: Some(Password::Plain("x".into())),
            ..Default::default()
        };
        assert!(matches!(user.matches("x"), Err(CryptoError::NotHashed)));
    }

    #[test]
    fn test_password_from_phc() {
        let hash = fast_manager().hash_password("correct horse").unwrap();
        assert_eq!(
            Password::from_phc(hash.clone()).unwrap(),
            Password::Hashed(hash)
        );

        assert!(matches!(
            Password::from_phc("hunter22"),
            Err(CryptoError::Argon2(_))
        ));
    }

    #[test]
    fn test_password_debug_is_redacted() {
        let debug = format!("{:?}", Password::Plain("hunter22".into()));
        assert!(!debug.contains("hunter22"));
        assert_eq!(debug, r#"Plain("[REDACTED]")"#);
    }

    #[test]
    fn test_password_never_serialized() {
        let user = User {
            email: "x@example.com".into(),
            password: Some(Password::Hashed("$argon2id$...".into())),
            ..Default::default()
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["email"], "x@example.com");
    }

    #[test]
    fn test_gender_from_str() {
        assert_eq!("Female".parse::<Gender>().unwrap(), Gender::Female);
        assert_eq!(
            Gender::Unspecified.to_string().parse::<Gender>().unwrap(),
            Gender::Unspecified
        );

        let err = "Unknown".parse::<Gender>().unwrap_err();
        assert!(err.to_string().contains("Unknown"));
    }

    #[test]
    fn test_deserialize_document() {
        let json = serde_json::json!({
            "givenName": "Maria",
            "familyName": "Souza",
            "email": "maria@example.com",
            "gender": "Female",
            "profiles": ["user"],
            "contacts": [{ "type": "phone", "value": "+55 11 99999-0000", "verified": false }],
            "experience": [{
                "company": "Acme",
                "role": "Engineer",
                "startDate": "2020-01-01",
                "current": true,
                "description": "Backend work"
            }]
        });

        let user: User = serde_json::from_value(json).unwrap();
        assert_eq!(user.gender, Some(Gender::Female));
        assert_eq!(user.contacts[0].kind, "phone");
        assert_eq!(user.experience[0].start_date.as_deref(), Some("2020-01-01"));
        assert!(user.experience[0].end_date.is_none());
        assert!(user.password.is_none());
    }

    #[test]
    fn test_deserialize_unknown_gender() {
        let json = serde_json::json!({
            "givenName": "Maria",
            "familyName": "Souza",
            "email": "maria@example.com",
            "gender": "Robot",
        });

        assert!(serde_json::from_value::<User>(json).is_err());
    }
}
