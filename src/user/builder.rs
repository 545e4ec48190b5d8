//! Typed builder for User.

use crate::user::{Gender, Password, User};

/// [`User`] builder.
#[derive(Debug, Clone)]
pub struct UserBuilder<Email, Pwd> {
    email: Email,
    password: Pwd,
    user: User,
}

/// Value is missing on [`UserBuilder`].
#[derive(Debug, Clone)]
pub struct Missing;

/// Value is present on [`UserBuilder`].
#[derive(Debug, Clone)]
pub struct Present<T>(pub T);

impl UserBuilder<Missing, Missing> {
    /// Create a new [`UserBuilder`].
    pub fn new() -> Self {
        Self {
            email: Missing,
            password: Missing,
            user: User::default(),
        }
    }
}

impl Default for UserBuilder<Missing, Missing> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Pwd> UserBuilder<Missing, Pwd> {
    /// Update `email` field on [`UserBuilder`].
    pub fn email(
        self,
        email: impl Into<String>,
    ) -> UserBuilder<Present<String>, Pwd> {
        UserBuilder {
            email: Present(email.into()),
            password: self.password,
            user: self.user,
        }
    }
}

impl<Email> UserBuilder<Email, Missing> {
    /// Update `password` field on [`UserBuilder`] with a plaintext value.
    pub fn password(
        self,
        password: impl Into<String>,
    ) -> UserBuilder<Email, Present<Password>> {
        UserBuilder {
            email: self.email,
            password: Present(Password::Plain(password.into())),
            user: self.user,
        }
    }
}

impl<Email, Pwd> UserBuilder<Email, Pwd> {
    /// Update `given_name` and `family_name` fields on [`UserBuilder`].
    pub fn name(
        mut self,
        given_name: impl Into<String>,
        family_name: impl Into<String>,
    ) -> Self {
        self.user.given_name = given_name.into();
        self.user.family_name = family_name.into();
        self
    }

    /// Update `tax_id` field on [`UserBuilder`].
    pub fn tax_id(mut self, tax_id: impl Into<String>) -> Self {
        self.user.tax_id = Some(tax_id.into());
        self
    }

    /// Update `national_id` field on [`UserBuilder`].
    pub fn national_id(mut self, national_id: impl Into<String>) -> Self {
        self.user.national_id = Some(national_id.into());
        self
    }

    /// Update `gender` field on [`UserBuilder`].
    pub fn gender(mut self, gender: Gender) -> Self {
        self.user.gender = Some(gender);
        self
    }

    /// Add a role to `profiles`.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.user.profiles.push(profile.into());
        self
    }

    /// Update `bio` field on [`UserBuilder`].
    pub fn bio(mut self, bio: impl Into<String>) -> Self {
        self.user.bio = Some(bio.into());
        self
    }
}

impl UserBuilder<Present<String>, Present<Password>> {
    /// Build a [`User`] with `email` and `password`.
    ///
    /// The user has no id until saved.
    pub fn build(self) -> User {
        User {
            email: self.email.0,
            password: Some(self.password.0),
            ..self.user
        }
    }
}
