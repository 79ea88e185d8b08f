use anyhow::{Context, Result};
use async_trait::async_trait;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity verification collaborator. Opaque to this subsystem: a
/// credential either resolves to a worker id or the upgrade is rejected.
/// No retry policy is imposed here.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<Uuid>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// Verifies HS256 bearer tokens issued by the session service. The `sub`
/// claim carries the worker id.
pub struct JwtVerifier {
    decoding_key: DecodingKey,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

#[async_trait]
impl IdentityVerifier for JwtVerifier {
    async fn verify(&self, credential: &str) -> Result<Uuid> {
        let token = decode::<Claims>(credential, &self.decoding_key, &Validation::default())
            .context("token verification failed")?;
        let worker_id = Uuid::parse_str(&token.claims.sub)
            .context("token subject is not a worker id")?;
        Ok(worker_id)
    }
}
