use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Engine-side registration record for a custodied wallet. The wallet's private key never touches this
/// struct or this process — `address` is the public key the custody
/// oracle returned when the wallet was created.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UserProfile {
    pub wallet: String,
    pub address: String,
    pub label: Option<String>,
    pub created_at_unix: i64,
}
