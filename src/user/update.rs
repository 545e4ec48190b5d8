//! Partial update payload.

use serde::Deserialize;
use validator::Validate;

use crate::user::{
    Application, Contact, Course, Education, Experience, Gender, Language,
    Password, User, validation,
};

/// Fields to overwrite on a stored [`User`].
///
/// `None` leaves the stored value untouched. Lists are replaced whole.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserUpdate {
    #[validate(length(
        min = 3,
        max = 100,
        message = "givenName must contain between 3 and 100 characters."
    ))]
    pub given_name: Option<String>,
    #[validate(length(
        min = 3,
        max = 100,
        message = "familyName must contain between 3 and 100 characters."
    ))]
    pub family_name: Option<String>,
    #[validate(length(
        min = 3,
        max = 14,
        message = "nationalId must contain between 3 and 14 characters."
    ))]
    pub national_id: Option<String>,
    #[validate(custom(function = "validation::validate_tax_id"))]
    pub tax_id: Option<String>,
    #[validate(custom(function = "validation::validate_email"))]
    pub email: Option<String>,
    pub birth_date: Option<String>,
    pub gender: Option<Gender>,
    pub marital_status: Option<String>,
    pub password: Option<Password>,
    pub profiles: Option<Vec<String>>,
    pub postal_code: Option<String>,
    pub number: Option<i32>,
    pub complement: Option<String>,
    pub street: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    #[validate(nested)]
    pub contacts: Option<Vec<Contact>>,
    #[validate(nested)]
    pub education: Option<Vec<Education>>,
    #[validate(nested)]
    pub experience: Option<Vec<Experience>>,
    #[validate(nested)]
    pub courses: Option<Vec<Course>>,
    #[validate(nested)]
    pub languages: Option<Vec<Language>>,
    #[validate(nested)]
    pub applications: Option<Vec<Application>>,
    #[validate(length(
        min = 50,
        max = 500,
        message = "bio must contain between 50 and 500 characters."
    ))]
    pub bio: Option<String>,
    pub recovery_code: Option<i64>,
}

impl UserUpdate {
    /// Set a new plaintext password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(Password::Plain(password.into()));
        self
    }

    /// Whether the payload would write anything.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overwrite the set fields of `user`.
    pub fn apply_to(&self, user: &mut User) {
        macro_rules! set {
            ($($field:ident),* $(,)?) => {
                $(
                    if let Some(value) = &self.$field {
                        user.$field = value.clone().into();
                    }
                )*
            };
        }

        set!(
            given_name,
            family_name,
            national_id,
            tax_id,
            email,
            birth_date,
            gender,
            marital_status,
            password,
            profiles,
            postal_code,
            number,
            complement,
            street,
            district,
            city,
            state,
            contacts,
            education,
            experience,
            courses,
            languages,
            applications,
            bio,
            recovery_code,
        );
    }
}
