use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Executor (provision / action scripts)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Configuration for the script-backed executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Working directory both commands run in.
    #[serde(default = "d_workdir")]
    pub workdir: PathBuf,
    /// Shell command that prints the provisioned credential as JSON.
    #[serde(default = "d_provision_command")]
    pub provision_command: String,
    /// Shell command that performs the action.  `"$@"` is appended and the
    /// session secret passed as `$1`, so it is never spliced into the
    /// command string.
    #[serde(default = "d_action_command")]
    pub action_command: String,
    /// Hard timeout per invocation (seconds).  The child is killed on expiry.
    #[serde(default = "d_60")]
    pub timeout_sec: u64,
    /// Max bytes kept from each of stdout / stderr.
    #[serde(default = "d_65536")]
    pub max_output_chars: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workdir: d_workdir(),
            provision_command: d_provision_command(),
            action_command: d_action_command(),
            timeout_sec: d_60(),
            max_output_chars: d_65536(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_workdir() -> PathBuf {
    PathBuf::from(".")
}
fn d_provision_command() -> String {
    "bash ../packages/contract/script/generate_wallet.sh".into()
}
fn d_action_command() -> String {
    "bash ../packages/contract/script/deploy.sh".into()
}
fn d_60() -> u64 {
    60
}
fn d_65536() -> usize {
    65_536
}
