//! Credential issuer
//!
//! Mints access keys for a deployed gateway. Each request stands alone: a
//! failed request is reported and the next one still runs. Key values are
//! handed back to the caller and never logged or stored here.

use crate::error::{CloudError, Result};
use crate::provider::CloudProvider;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Intended use of an issued key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyScope {
    Admin,
    Client,
    Development,
}

impl std::fmt::Display for KeyScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyScope::Admin => write!(f, "admin"),
            KeyScope::Client => write!(f, "client"),
            KeyScope::Development => write!(f, "development"),
        }
    }
}

impl FromStr for KeyScope {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(KeyScope::Admin),
            "client" => Ok(KeyScope::Client),
            "development" | "dev" => Ok(KeyScope::Development),
            other => Err(CloudError::config(format!(
                "unknown key scope '{}' (expected admin, client or development)",
                other
            ))),
        }
    }
}

/// One key to mint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRequest {
    pub display_name: String,
    pub scope: KeyScope,
}

impl KeyRequest {
    pub fn new(display_name: impl Into<String>, scope: KeyScope) -> Self {
        Self {
            display_name: display_name.into(),
            scope,
        }
    }

    /// Admin, client and development keys named after `prefix`
    pub fn default_set(prefix: &str) -> Vec<KeyRequest> {
        vec![
            KeyRequest::new(format!("{} Admin", prefix), KeyScope::Admin),
            KeyRequest::new(format!("{} Client", prefix), KeyScope::Client),
            KeyRequest::new(format!("{} Development", prefix), KeyScope::Development),
        ]
    }
}

/// Parses `NAME:SCOPE`; the scope is taken after the last colon
impl FromStr for KeyRequest {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self> {
        let (name, scope) = s.rsplit_once(':').ok_or_else(|| {
            CloudError::config(format!("key request '{}' must look like NAME:SCOPE", s))
        })?;
        let name = name.trim();
        if name.is_empty() {
            return Err(CloudError::config(format!(
                "key request '{}' has an empty display name",
                s
            )));
        }
        Ok(KeyRequest::new(name, scope.parse()?))
    }
}

/// A freshly minted key
///
/// `Debug` redacts the secret; use [`IssuedKey::key_value`] to read it.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedKey {
    pub display_name: String,
    pub scope: KeyScope,
    key_value: String,
}

impl IssuedKey {
    pub fn new(display_name: impl Into<String>, scope: KeyScope, key_value: String) -> Self {
        Self {
            display_name: display_name.into(),
            scope,
            key_value,
        }
    }

    pub fn key_value(&self) -> &str {
        &self.key_value
    }

    pub fn into_key_value(self) -> String {
        self.key_value
    }
}

impl std::fmt::Debug for IssuedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedKey")
            .field("display_name", &self.display_name)
            .field("scope", &self.scope)
            .field("key_value", &"<redacted>")
            .finish()
    }
}

pub struct KeyIssuer<'a> {
    provider: &'a dyn CloudProvider,
}

impl<'a> KeyIssuer<'a> {
    pub fn new(provider: &'a dyn CloudProvider) -> Self {
        Self { provider }
    }

    /// Mint every requested key, in order, continuing past failures
    pub async fn issue_keys(&self, requests: &[KeyRequest]) -> Vec<Result<IssuedKey>> {
        let mut results = Vec::with_capacity(requests.len());

        for request in requests {
            tracing::info!(
                display_name = %request.display_name,
                scope = %request.scope,
                "Creating API key"
            );

            let result = self
                .provider
                .create_key(&request.display_name)
                .await
                .map(|value| IssuedKey::new(request.display_name.clone(), request.scope, value));

            if let Err(e) = &result {
                tracing::warn!(display_name = %request.display_name, "Key creation failed: {}", e);
            }
            results.push(result);
        }

        results
    }
}
