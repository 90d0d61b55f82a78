// Short-link minting: a 7-character code drawn uniformly from the
// 62-character alphabet, composed onto the environment's base URL. The
// shortcode column carries a unique index; an insert that collides simply
// regenerates the code and tries again.

use chrono::Utc;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use rand::{thread_rng, Rng};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::app_config::{AppConfig, Environment};
use crate::db::DieselPool;
use crate::models::short_link::NewShortLink;

pub const SHORTCODE_LEN: usize = 7;
const SHORTCODE_ALPHABET: &[u8] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const MAX_MINT_ATTEMPTS: usize = 5;

#[derive(Error, Debug)]
pub enum ShortLinkError {
    #[error("invalid shortlink: {0}")]
    Invalid(String),
    #[error("shortcode collisions exhausted {0} attempts")]
    CollisionRetriesExhausted(usize),
    #[error("database error: {0}")]
    Database(#[from] DieselError),
    #[error("pool error: {0}")]
    Pool(String),
}

/// Random 7-char code. thread_rng is a CSPRNG, so codes are neither
/// predictable nor correlated across processes.
pub fn generate_shortcode() -> String {
    let mut rng = thread_rng();
    (0..SHORTCODE_LEN)
        .map(|_| SHORTCODE_ALPHABET[rng.gen_range(0..SHORTCODE_ALPHABET.len())] as char)
        .collect()
}

#[derive(Clone)]
pub struct ShortLinkService {
    pool: DieselPool,
    config: Arc<AppConfig>,
}

impl ShortLinkService {
    pub fn new(pool: DieselPool, config: Arc<AppConfig>) -> Self {
        Self { pool, config }
    }

    /// Build a shortlink for the environment without touching the database
    pub fn mint(&self, env: Environment) -> NewShortLink {
        let short_code = generate_shortcode();
        let base_url = self.config.shortlink_base(env).to_string();
        NewShortLink {
            id: Uuid::new_v4(),
            short_link: format!("{}{}", base_url, short_code),
            base_url,
            short_code,
            environment: env.to_string(),
            created_at: Utc::now(),
        }
    }

    /// Insert the link. A unique-index collision regenerates the code in
    /// place and retries; the caller's struct always reflects what was
    /// stored.
    pub async fn persist(&self, link: &mut NewShortLink) -> Result<(), ShortLinkError> {
        link.validate().map_err(ShortLinkError::Invalid)?;

        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| ShortLinkError::Pool(e.to_string()))?;

        for _ in 0..MAX_MINT_ATTEMPTS {
            match link.insert(&mut conn).await {
                Ok(_) => return Ok(()),
                Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                    warn!("shortcode collision on {}; regenerating", link.short_code);
                    link.short_code = generate_shortcode();
                    link.short_link = format!("{}{}", link.base_url, link.short_code);
                },
                Err(e) => return Err(ShortLinkError::Database(e)),
            }
        }

        Err(ShortLinkError::CollisionRetriesExhausted(MAX_MINT_ATTEMPTS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn shortcodes_are_seven_alphanumeric_chars() {
        for _ in 0..500 {
            let code = generate_shortcode();
            assert_eq!(code.len(), SHORTCODE_LEN);
            assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn shortcodes_do_not_visibly_collide() {
        // 62^7 keyspace: 1000 draws colliding would indicate a broken RNG
        let codes: HashSet<String> = (0..1000).map(|_| generate_shortcode()).collect();
        assert_eq!(codes.len(), 1000);
    }

    #[test]
    fn alphabet_covers_exactly_the_62_charset() {
        assert_eq!(SHORTCODE_ALPHABET.len(), 62);
        let set: HashSet<u8> = SHORTCODE_ALPHABET.iter().copied().collect();
        assert_eq!(set.len(), 62);
        assert!(set.iter().all(|b| b.is_ascii_alphanumeric()));
    }
}
