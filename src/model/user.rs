use std::ops::{Deref, DerefMut};

use mongodb::bson::{doc, Document};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    auth::Role,
    mongodb::{Coll, Id},
};
use crate::Config;

/// Core account data for panel users (admins and poll workers), as stored
/// in the `users` collection.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCore {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

impl UserCore {
    /// Create an account with a freshly hashed password.
    pub fn new(username: impl Into<String>, password: &str, role: Role) -> Result<Self> {
        let salt: [u8; 16] = rand::random();
        let password_hash =
            argon2::hash_encoded(password.as_bytes(), &salt, &argon2::Config::default())?;
        Ok(Self {
            username: username.into(),
            password_hash,
            role,
        })
    }

    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        // A malformed stored hash fails verification rather than panicking.
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }

    /// Filter matching a username.
    pub fn by_username(username: &str) -> Document {
        doc! { "username": username }
    }
}

/// An account without an ID.
pub type NewUser = UserCore;

/// An account from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub user: UserCore,
}

impl Deref for User {
    type Target = UserCore;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl DerefMut for User {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.user
    }
}

/// Username/password pair submitted on login.
#[derive(Debug, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Seed a default admin account if no admin exists yet, so a fresh
/// deployment can always be managed.
///
/// This operation is idempotent.
pub async fn ensure_admin_exists(
    users: &Coll<User>,
    new_users: &Coll<NewUser>,
    config: &Config,
) -> Result<()> {
    let with_admin_role = doc! { "role": Role::Admin };
    if users.find_one(with_admin_role, None).await?.is_none() {
        warn!("No admin account found; seeding '{DEFAULT_ADMIN_USERNAME}' with the configured password");
        let admin = NewUser::new(
            DEFAULT_ADMIN_USERNAME,
            config.default_admin_password(),
            Role::Admin,
        )?;
        new_users.insert_one(admin, None).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_verification() {
        let user = UserCore::new("ana", "segredo123", Role::Admin).unwrap();

        assert!(user.verify_password("segredo123"));
        assert!(!user.verify_password("segredo124"));
        assert!(!user.verify_password(""));
    }

    #[test]
    fn hashes_are_salted() {
        let first = UserCore::new("ana", "segredo123", Role::Admin).unwrap();
        let second = UserCore::new("ana", "segredo123", Role::Admin).unwrap();

        assert_ne!(first.password_hash, second.password_hash);
    }

    #[test]
    fn malformed_hash_fails_closed() {
        let user = UserCore {
            username: "ana".to_string(),
            password_hash: "not-an-argon2-hash".to_string(),
            role: Role::Mesario,
        };

        assert!(!user.verify_password("anything"));
    }
}
