//! Salted PBKDF2-HMAC-SHA256 password hashing.
//!
//! Stored format: `pbkdf2-sha256$<rounds>$<salt hex>$<hash hex>`.

use sha2::Sha256;
use subtle::ConstantTimeEq;
use tokio::task::{self, JoinError};

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct PasswordHasher {
    rounds: u32,
}

impl PasswordHasher {
    pub fn new(rounds: u32) -> Self {
        Self { rounds }
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Hash a password with a fresh random salt
    pub fn hash(&self, password: &str) -> String {
        let salt: [u8; SALT_LEN] = rand::random();
        let digest = derive(password, &salt, self.rounds);
        format!(
            "{}${}${}${}",
            SCHEME,
            self.rounds,
            hex::encode(salt),
            hex::encode(digest)
        )
    }

    /// Check a password against a stored hash in constant time.
    /// Malformed hashes never verify.
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        let mut parts = stored.split('$');
        let (Some(scheme), Some(rounds), Some(salt), Some(expected), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return false;
        };

        if scheme != SCHEME {
            return false;
        }
        let Ok(rounds) = rounds.parse::<u32>() else {
            return false;
        };
        let (Ok(salt), Ok(expected)) = (hex::decode(salt), hex::decode(expected)) else {
            return false;
        };
        if rounds == 0 || expected.len() != HASH_LEN {
            return false;
        }

        let digest = derive(password, &salt, rounds);
        digest.as_slice().ct_eq(expected.as_slice()).into()
    }

    /// Burn the same work as a real verification, for unknown users
    pub fn verify_dummy(&self, password: &str) {
        let _ = derive(password, &[0u8; SALT_LEN], self.rounds);
    }

    /// `hash` on the blocking pool, keeping the key stretch off async workers
    pub async fn hash_blocking(&self, password: &str) -> Result<String, JoinError> {
        let hasher = self.clone();
        let password = password.to_string();
        task::spawn_blocking(move || hasher.hash(&password)).await
    }

    pub async fn verify_blocking(&self, password: &str, stored: &str) -> Result<bool, JoinError> {
        let hasher = self.clone();
        let password = password.to_string();
        let stored = stored.to_string();
        task::spawn_blocking(move || hasher.verify(&password, &stored)).await
    }

    pub async fn verify_dummy_blocking(&self, password: &str) -> Result<(), JoinError> {
        let hasher = self.clone();
        let password = password.to_string();
        task::spawn_blocking(move || hasher.verify_dummy(&password)).await
    }
}

fn derive(password: &str, salt: &[u8], rounds: u32) -> [u8; HASH_LEN] {
    let mut out = [0u8; HASH_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, rounds, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(1_000)
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = hasher();
        let stored = hasher.hash("hunter2");

        assert!(stored.starts_with("pbkdf2-sha256$1000$"));
        assert!(!stored.contains("hunter2"));
        assert!(hasher.verify("hunter2", &stored));
        assert!(!hasher.verify("hunter3", &stored));
        assert!(!hasher.verify("", &stored));
    }

    #[test]
    fn test_salts_differ() {
        let hasher = hasher();
        assert_ne!(hasher.hash("same"), hasher.hash("same"));
    }

    #[test]
    fn test_verify_uses_stored_rounds() {
        let stored = PasswordHasher::new(500).hash("pw");
        assert!(hasher().verify("pw", &stored));
    }

    #[test]
    fn test_malformed_hashes_never_verify() {
        let hasher = hasher();
        assert!(!hasher.verify("pw", ""));
        assert!(!hasher.verify("pw", "pw"));
        assert!(!hasher.verify("pw", "md5$1000$00$00"));
        assert!(!hasher.verify("pw", "pbkdf2-sha256$abc$00$00"));
        assert!(!hasher.verify("pw", "pbkdf2-sha256$1000$zz$00"));
        assert!(!hasher.verify("pw", "pbkdf2-sha256$0$00$00"));
        assert!(!hasher.verify("pw", "pbkdf2-sha256$1000$00$00$extra"));
    }

    #[tokio::test]
    async fn test_blocking_variants_match_inline() {
        let hasher = hasher();
        let stored = hasher.hash_blocking("hunter2").await.unwrap();

        assert!(hasher.verify("hunter2", &stored));
        assert!(hasher.verify_blocking("hunter2", &stored).await.unwrap());
        assert!(!hasher.verify_blocking("hunter3", &stored).await.unwrap());
        hasher.verify_dummy_blocking("hunter2").await.unwrap();
    }

    #[tokio::test]
    async fn test_hashing_leaves_the_runtime_free() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;
        use std::time::Duration;

        // Single-threaded runtime: the ticker only runs while hashing yields
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(1));
            loop {
                interval.tick().await;
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        PasswordHasher::new(50_000)
            .hash_blocking("hunter2")
            .await
            .unwrap();
        let seen = ticks.load(Ordering::SeqCst);
        ticker.abort();

        assert!(seen > 0);
    }
}
