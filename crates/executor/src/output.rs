//! Decoding of executor stdout.
//!
//! Scripts print one JSON object.  Some print progress lines first, so when
//! the whole output is not JSON the last line that parses as an object is
//! used.  Field names from the original wallet/deploy scripts are accepted
//! alongside the canonical names.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use lp_domain::{ActionOutcome, Provisioned};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProvisioned {
    #[serde(alias = "walletAddress")]
    credential_address: String,
    #[serde(alias = "privateKey")]
    secret: String,
    #[serde(alias = "faucet", alias = "faucetUrl")]
    funding_hint: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAction {
    #[serde(alias = "contractAddress")]
    action_address: String,
    #[serde(alias = "contractLink", alias = "explorerUrl")]
    reference_link: String,
}

/// Parse provisioning output.
pub fn parse_provisioned(stdout: &str) -> Result<Provisioned, String> {
    let raw: RawProvisioned = decode_object(stdout)?;
    if raw.credential_address.trim().is_empty() || raw.secret.trim().is_empty() {
        return Err("credential address or secret is empty".into());
    }
    Ok(Provisioned {
        credential_address: raw.credential_address,
        secret: raw.secret,
        funding_hint: raw.funding_hint,
    })
}

/// Parse action output.
pub fn parse_action(stdout: &str) -> Result<ActionOutcome, String> {
    let raw: RawAction = decode_object(stdout)?;
    if raw.action_address.trim().is_empty() {
        return Err("action address is empty".into());
    }
    Ok(ActionOutcome {
        action_address: raw.action_address,
        reference_link: raw.reference_link,
    })
}

fn decode_object<T: DeserializeOwned>(stdout: &str) -> Result<T, String> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err("no output".into());
    }

    let whole = serde_json::from_str::<T>(trimmed);
    let first_err = match whole {
        Ok(v) => return Ok(v),
        Err(e) => e.to_string(),
    };

    trimmed
        .lines()
        .rev()
        .map(str::trim)
        .filter(|l| l.starts_with('{'))
        .find_map(|l| serde_json::from_str::<T>(l).ok())
        .ok_or(first_err)
}
