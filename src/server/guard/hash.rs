use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::key::HashKey;
use super::AccountSnapshot;

type HmacSha256 = Hmac<Sha256>;

/// Derives the verification hash for an account snapshot.
///
/// The hash is `base64url(HMAC-SHA256(key, "{username}:{credential}:{last_login}"))`
/// without padding. It embeds the last login time, so it changes as soon as
/// the account completes another primary login.
#[derive(Clone)]
pub struct LoginHasher {
    mac: HmacSha256,
}

impl LoginHasher {
    const DELIMITER: char = ':';

    /// HMAC accepts keys of any length, and `HashKey` already enforces the
    /// minimum, so building a hasher cannot fail.
    pub fn new(key: &HashKey) -> Self {
        let mac = HmacSha256::new_from_slice(key.as_bytes()).expect("hmac accepts any key length");
        Self { mac }
    }

    pub fn derive(&self, snapshot: &AccountSnapshot) -> String {
        // Fields are never split back apart, a delimiter inside a field is
        // harmless
        let data = format!(
            "{}{}{}{}{}",
            snapshot.username,
            Self::DELIMITER,
            snapshot.credential_secret,
            Self::DELIMITER,
            snapshot.last_login
        );

        let mut mac = self.mac.clone();
        mac.update(data.as_bytes());
        let digest = mac.finalize().into_bytes();

        URL_SAFE_NO_PAD.encode(digest)
    }
}
