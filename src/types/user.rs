use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::time::format_since;

/// Public view of an account. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub name: String,

    /// Last completed primary login, 0 if the user never logged in.
    pub login_time: u64,

    pub update_time: u64,
}

/// Password material as stored in the user table.
#[derive(Debug, Clone, PartialEq)]
pub struct PasswordHash {
    /// Hex SHA256 of password + salt
    pub hash: String,
    pub salt: String,
}

impl User {
    /// Length of the random salt used for password hashing
    pub const SALT_LENGTH: usize = 30;

    pub fn display_row(&self) -> String {
        format!(
            "{:<20} {:<16} {}",
            self.name,
            format_since(self.login_time),
            format_since(self.update_time)
        )
    }
}

impl PasswordHash {
    /// Hashes `password` with a fresh random salt.
    pub fn generate(password: &str) -> Self {
        let salt = Self::generate_salt(User::SALT_LENGTH);
        let hash = Self::digest(password, &salt);
        Self { hash, salt }
    }

    /// The hash is generated using SHA256(password + salt)
    pub fn digest(password: &str, salt: &str) -> String {
        let combined = format!("{password}{salt}");
        let hash = Sha256::digest(combined.as_bytes());
        format!("{:x}", hash)
    }

    pub fn verify(&self, password: &str) -> bool {
        Self::digest(password, &self.salt) == self.hash
    }

    fn generate_salt(length: usize) -> String {
        const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
        let mut rng = rand::thread_rng();

        (0..length)
            .map(|_| {
                let idx = rng.gen_range(0..CHARSET.len());
                CHARSET[idx] as char
            })
            .collect()
    }
}
