//! Gateway credential selection.
//!
//! Precedence, given an optional mode override and optional live/test pairs:
//! an explicit `test` override wins when a test pair exists; a missing live
//! pair falls back to test; no pair at all yields `None`; everything else is
//! live. A pair only counts when both its id and secret are non-empty, and the
//! id and secret returned always come from the same pair.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use strum::{Display, EnumString};

pub const ENV_MODE: &str = "RAZORPAY_MODE";
pub const ENV_KEY_ID: &str = "RAZORPAY_KEY_ID";
pub const ENV_KEY_SECRET: &str = "RAZORPAY_KEY_SECRET";
pub const ENV_LIVE_KEY_ID: &str = "RAZORPAY_LIVE_KEY_ID";
pub const ENV_LIVE_KEY_SECRET: &str = "RAZORPAY_LIVE_KEY_SECRET";
pub const ENV_TEST_KEY_ID: &str = "RAZORPAY_TEST_KEY_ID";
pub const ENV_TEST_KEY_SECRET: &str = "RAZORPAY_TEST_KEY_SECRET";

/// Which credential set an operation runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GatewayMode {
    Live,
    Test,
}

/// A complete id/secret pair
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    id: String,
    secret: String,
}

impl KeyPair {
    /// Builds a pair from raw values; blank or missing halves yield `None`.
    pub fn from_parts(id: Option<&str>, secret: Option<&str>) -> Option<Self> {
        let id = id.map(str::trim).filter(|v| !v.is_empty())?;
        let secret = secret.map(str::trim).filter(|v| !v.is_empty())?;
        Some(Self {
            id: id.to_string(),
            secret: secret.to_string(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("id", &key_prefix(&self.id))
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Raw configuration the resolver works from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMaterial {
    pub mode_override: Option<String>,
    pub live: Option<KeyPair>,
    pub test: Option<KeyPair>,
}

impl KeyMaterial {
    /// Reads the deployment's environment variables.
    ///
    /// The live pair comes from `RAZORPAY_KEY_ID`/`RAZORPAY_KEY_SECRET`, each half
    /// falling back to its `RAZORPAY_LIVE_*` counterpart when unset or blank.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let live_id = non_blank(ENV_KEY_ID).or_else(|| non_blank(ENV_LIVE_KEY_ID));
        let live_secret = non_blank(ENV_KEY_SECRET).or_else(|| non_blank(ENV_LIVE_KEY_SECRET));

        Self {
            mode_override: non_blank(ENV_MODE),
            live: KeyPair::from_parts(live_id.as_deref(), live_secret.as_deref()),
            test: KeyPair::from_parts(
                non_blank(ENV_TEST_KEY_ID).as_deref(),
                non_blank(ENV_TEST_KEY_SECRET).as_deref(),
            ),
        }
    }

    fn override_is_test(&self) -> bool {
        self.mode_override
            .as_deref()
            .map(|mode| mode.trim().eq_ignore_ascii_case("test"))
            .unwrap_or(false)
    }
}

/// The credential set chosen for one operation
#[derive(Clone, PartialEq, Eq)]
pub struct GatewayCredentials {
    pub mode: GatewayMode,
    pub key_id: String,
    pub key_secret: String,
}

impl GatewayCredentials {
    /// Short, log-safe form of the key id.
    pub fn key_prefix(&self) -> &str {
        key_prefix(&self.key_id)
    }
}

impl fmt::Debug for GatewayCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayCredentials")
            .field("mode", &self.mode)
            .field("key_id", &self.key_prefix())
            .field("key_secret", &"<redacted>")
            .finish()
    }
}

fn key_prefix(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

/// Picks the credential pair for a request. Pure; see the module docs for precedence.
pub fn resolve_credentials(material: &KeyMaterial) -> Option<GatewayCredentials> {
    let (mode, pair) = match (&material.live, &material.test) {
        (_, Some(test)) if material.override_is_test() => (GatewayMode::Test, test),
        (None, Some(test)) => (GatewayMode::Test, test),
        (None, None) => return None,
        (Some(live), _) => (GatewayMode::Live, live),
    };

    Some(GatewayCredentials {
        mode,
        key_id: pair.id.clone(),
        key_secret: pair.secret.clone(),
    })
}

/// Supplies key material at the moment a request needs it
pub trait CredentialSource: Send + Sync {
    fn key_material(&self) -> KeyMaterial;

    fn resolve(&self) -> Option<GatewayCredentials> {
        resolve_credentials(&self.key_material())
    }
}

/// Re-reads the process environment on every call so rotated keys apply without a restart.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentialSource;

impl CredentialSource for EnvCredentialSource {
    fn key_material(&self) -> KeyMaterial {
        KeyMaterial::from_env()
    }
}

/// Fixed key material
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialSource {
    material: KeyMaterial,
}

impl StaticCredentialSource {
    pub fn new(material: KeyMaterial) -> Self {
        Self { material }
    }
}

impl CredentialSource for StaticCredentialSource {
    fn key_material(&self) -> KeyMaterial {
        self.material.clone()
    }
}
