use serde::Deserialize;
use std::path::Path;

use crate::error::{FlowTTSError, FlowTTSResult};

/// YAML configuration file layout
///
/// Every field is optional. Values present here override environment variables.
///
/// # Example YAML structure
/// ```yaml
/// tencent:
///   secret_id: "AKID..."
///   secret_key: "your-secret-key"
///   region: "ap-shanghai"
///
/// trtc:
///   sdk_app_id: 1400000000
///   endpoint: "https://trtc.ai.tencentcloudapi.com/"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub tencent: Option<TencentYaml>,
    pub trtc: Option<TrtcYaml>,
}

/// Tencent Cloud account settings from YAML
#[derive(Clone, Deserialize, Default)]
#[serde(default)]
pub struct TencentYaml {
    pub secret_id: Option<String>,
    pub secret_key: Option<String>,
    pub region: Option<String>,
}

impl std::fmt::Debug for TencentYaml {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TencentYaml")
            .field("secret_id", &self.secret_id)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("region", &self.region)
            .finish()
    }
}

/// TRTC application settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TrtcYaml {
    pub sdk_app_id: Option<u64>,
    pub endpoint: Option<String>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if the file cannot be read or the YAML is malformed.
    pub fn from_file(path: &Path) -> FlowTTSResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            FlowTTSError::InvalidConfiguration(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        serde_yaml::from_str(&contents).map_err(|e| {
            FlowTTSError::InvalidConfiguration(format!("Failed to parse YAML config: {e}"))
        })
    }
}
