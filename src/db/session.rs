// SPDX-License-Identifier: MIT

//! Session store: opaque session ids behind an HMAC-signed cookie.
//!
//! The store is the sole custodian of OAuth tokens. Backends implement a
//! per-key load/save/destroy contract with sliding TTL expiry; the default
//! in-process backend keeps entries in a `DashMap`. A durable backend only
//! needs to honor the same key/TTL contract.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use hmac::{Hmac, Mac};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::AppError;
use crate::models::SessionData;

type HmacSha256 = Hmac<Sha256>;

const SESSION_ID_BYTES: usize = 32;

/// Per-key persistence contract for session data.
///
/// `load` renews the entry's TTL (sliding expiry) and must return `None`
/// for expired or unknown keys. `destroy` is idempotent.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn load(&self, sid: &str) -> anyhow::Result<Option<SessionData>>;
    async fn save(&self, sid: &str, data: &SessionData) -> anyhow::Result<()>;
    async fn destroy(&self, sid: &str) -> anyhow::Result<()>;
}

struct Entry {
    data: SessionData,
    expires_at: DateTime<Utc>,
}

/// In-process session backend.
pub struct MemoryBackend {
    entries: DashMap<String, Entry>,
    ttl: Duration,
}

impl MemoryBackend {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: Duration::seconds(ttl_secs as i64),
        }
    }
}

#[async_trait]
impl SessionBackend for MemoryBackend {
    async fn load(&self, sid: &str) -> anyhow::Result<Option<SessionData>> {
        let now = Utc::now();

        if let Some(mut entry) = self.entries.get_mut(sid) {
            if entry.expires_at <= now {
                drop(entry);
                self.entries.remove(sid);
                return Ok(None);
            }
            // Sliding expiry: every read renews the TTL.
            entry.expires_at = now + self.ttl;
            return Ok(Some(entry.data.clone()));
        }

        Ok(None)
    }

    async fn save(&self, sid: &str, data: &SessionData) -> anyhow::Result<()> {
        self.entries.insert(
            sid.to_string(),
            Entry {
                data: data.clone(),
                expires_at: Utc::now() + self.ttl,
            },
        );
        Ok(())
    }

    async fn destroy(&self, sid: &str) -> anyhow::Result<()> {
        self.entries.remove(sid);
        Ok(())
    }
}

/// Facade over a [`SessionBackend`] that also owns session id minting and
/// cookie-value signing.
///
/// Cookie values have the form `{sid}.{hex(hmac_sha256(sid))}` so a
/// tampered cookie is rejected before the store is consulted.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
    signing_key: Vec<u8>,
    rng: SystemRandom,
}

impl SessionStore {
    /// Store backed by the in-process memory backend.
    pub fn new_memory(signing_key: &[u8], ttl_secs: u64) -> Self {
        Self::with_backend(Arc::new(MemoryBackend::new(ttl_secs)), signing_key)
    }

    /// Store over any backend honoring the key/TTL contract.
    pub fn with_backend(backend: Arc<dyn SessionBackend>, signing_key: &[u8]) -> Self {
        Self {
            backend,
            signing_key: signing_key.to_vec(),
            rng: SystemRandom::new(),
        }
    }

    /// Mint a fresh opaque session id from the system CSPRNG.
    pub fn mint_id(&self) -> Result<String, AppError> {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| AppError::SessionStore("system RNG failure".to_string()))?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Signed value to hand to the client as the session cookie.
    pub fn cookie_value(&self, sid: &str) -> Result<String, AppError> {
        Ok(format!("{}.{}", sid, self.sign(sid)?))
    }

    /// Verify a presented cookie value and extract the session id.
    ///
    /// Returns `None` for malformed values and signature mismatches; the
    /// caller treats both the same as an absent cookie.
    pub fn verify_cookie(&self, value: &str) -> Option<String> {
        let (sid, sig_hex) = value.rsplit_once('.')?;
        let expected = self.sign(sid).ok()?;

        let matches: bool = expected.as_bytes().ct_eq(sig_hex.as_bytes()).into();
        if !matches {
            tracing::warn!("Session cookie signature mismatch");
            return None;
        }

        Some(sid.to_string())
    }

    pub async fn load(&self, sid: &str) -> Result<Option<SessionData>, AppError> {
        self.backend
            .load(sid)
            .await
            .map_err(|e| AppError::SessionStore(e.to_string()))
    }

    pub async fn save(&self, sid: &str, data: &SessionData) -> Result<(), AppError> {
        self.backend
            .save(sid, data)
            .await
            .map_err(|e| AppError::SessionStore(e.to_string()))
    }

    pub async fn destroy(&self, sid: &str) -> Result<(), AppError> {
        self.backend
            .destroy(sid)
            .await
            .map_err(|e| AppError::SessionStore(e.to_string()))
    }

    fn sign(&self, sid: &str) -> Result<String, AppError> {
        let mut mac = HmacSha256::new_from_slice(&self.signing_key)
            .map_err(|e| AppError::SessionStore(format!("HMAC init failed: {}", e)))?;
        mac.update(sid.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}
