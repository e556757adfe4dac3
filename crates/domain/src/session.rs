//! The session record and the values the executor hands back for it.

use std::fmt;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session ID
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Opaque session identifier.
///
/// Freshly minted IDs are UUID v4 strings (122 random bits from the OS
/// RNG).  IDs arriving from clients are wrapped as-is; the store decides
/// whether they name anything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Mint a new random session ID.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, for log lines.
    pub fn short(&self) -> &str {
        short_id(&self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Truncate an ID to at most eight characters without splitting a char.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Executor outputs
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Credential material produced by the provisioning phase.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provisioned {
    pub credential_address: String,
    pub secret: String,
    pub funding_hint: String,
}

impl fmt::Debug for Provisioned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provisioned")
            .field("credential_address", &self.credential_address)
            .field("secret", &"<redacted>")
            .field("funding_hint", &self.funding_hint)
            .finish()
    }
}

/// Result of a successful action phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    pub action_address: String,
    pub reference_link: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Persisted record
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The persisted form of a session.  The session ID is the store key and
/// is not repeated inside the record.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub credential_address: String,
    pub secret: String,
    pub funding_hint: String,
    /// Never written by the current workflow; kept so records that carry
    /// it still decode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_result: Option<ActionOutcome>,
}

impl SessionRecord {
    /// Decode a stored record, rejecting blank identity fields.
    pub fn decode(bytes: &[u8]) -> Result<Self, String> {
        let record: Self = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
        if record.credential_address.is_empty() || record.secret.is_empty() {
            return Err("record is missing credential fields".into());
        }
        Ok(record)
    }

    /// Encode as pretty JSON (the on-disk format).
    pub fn encode(&self) -> crate::Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

impl From<Provisioned> for SessionRecord {
    fn from(p: Provisioned) -> Self {
        Self {
            credential_address: p.credential_address,
            secret: p.secret,
            funding_hint: p.funding_hint,
            action_result: None,
        }
    }
}

impl fmt::Debug for SessionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRecord")
            .field("credential_address", &self.credential_address)
            .field("secret", &"<redacted>")
            .field("funding_hint", &self.funding_hint)
            .field("action_result", &self.action_result)
            .finish()
    }
}
