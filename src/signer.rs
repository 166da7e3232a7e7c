//! Signing and verification of session ids carried in the cookie.
//!
//! A signed value is `<session_id>.<signature>`, where the signature is an HMAC-SHA256 of the id,
//! base64url encoded without padding.
//!
//! # Key rotation
//! A signer holds an ordered list of secrets. The first one (the primary) signs; every secret,
//! primary first and then fallbacks in the order they were added, is tried when verifying. To
//! rotate, make the new secret primary and keep the old one as a fallback until cookies signed
//! with it have expired.

use std::{fmt, sync::Arc};

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

const SALT: &[u8] = b"session.Signer";
const SEPARATOR: char = '.';

#[derive(Clone)]
pub struct SessionSigner {
    keys: Arc<[[u8; 32]]>,
}

impl SessionSigner {
    /// Create a signer whose primary secret is `secret`.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            keys: Arc::from([derive_key(secret.as_ref())]),
        }
    }

    /// Create a signer from an ordered list of secrets. The first one is primary, the rest are
    /// fallbacks in order.
    ///
    /// Returns `None` if `secrets` is empty.
    pub fn from_secrets<I>(secrets: I) -> Option<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let keys: Arc<[[u8; 32]]> = secrets
            .into_iter()
            .map(|secret| derive_key(secret.as_ref()))
            .collect();

        (!keys.is_empty()).then_some(Self { keys })
    }

    /// Accept values signed with `secret` as well. Fallbacks never sign.
    #[must_use]
    pub fn with_fallback(self, secret: impl AsRef<[u8]>) -> Self {
        let keys = self
            .keys
            .iter()
            .copied()
            .chain(std::iter::once(derive_key(secret.as_ref())))
            .collect();
        Self { keys }
    }

    /// Sign `session_id` with the primary secret.
    pub fn sign(&self, session_id: &str) -> String {
        let tag = keyed_mac(&self.keys[0], session_id).finalize().into_bytes();
        format!("{session_id}{SEPARATOR}{}", URL_SAFE_NO_PAD.encode(tag))
    }

    pub fn validate(&self, value: &str) -> bool {
        self.unsign(value).is_some()
    }

    /// Verify `value` and return the session id it carries.
    ///
    /// Malformed values and bad signatures both yield `None`.
    pub fn unsign<'a>(&self, value: &'a str) -> Option<&'a str> {
        let (session_id, signature) = value.rsplit_once(SEPARATOR)?;
        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;

        self.keys
            .iter()
            .any(|key| keyed_mac(key, session_id).verify_slice(&signature).is_ok())
            .then_some(session_id)
    }
}

impl fmt::Debug for SessionSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSigner")
            .field("keys", &self.keys.len())
            .finish_non_exhaustive()
    }
}

fn keyed_mac(key: &[u8; 32], session_id: &str) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(session_id.as_bytes());
    mac
}

fn derive_key(secret: &[u8]) -> [u8; 32] {
    Sha256::new()
        .chain_update(SALT)
        .chain_update(b"signer")
        .chain_update(secret)
        .finalize()
        .into()
}
