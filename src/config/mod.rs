//! Client configuration
//!
//! Configuration comes from environment variables, an optional YAML file and
//! built-in defaults. Priority: YAML > ENV vars > defaults. The binary loads a
//! `.env` file into the environment at startup, so `.env` values behave like
//! environment variables here.
//!
//! | Field        | Environment variable | YAML                 | Default                                |
//! |--------------|----------------------|----------------------|----------------------------------------|
//! | `secret_id`  | `TX_SECRET_ID`       | `tencent.secret_id`  | required                               |
//! | `secret_key` | `TX_SECRET_KEY`      | `tencent.secret_key` | required                               |
//! | `sdk_app_id` | `TRTC_SDK_APP_ID`    | `trtc.sdk_app_id`    | required                               |
//! | `region`     | `TX_REGION`          | `tencent.region`     | `ap-beijing`                           |
//! | `endpoint`   | `FLOW_TTS_ENDPOINT`  | `trtc.endpoint`      | `https://trtc.ai.tencentcloudapi.com/` |
//!
//! # Example
//! ```rust,no_run
//! use flow_tts::config::FlowTTSConfig;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = FlowTTSConfig::from_env()?;
//!
//! // Load from YAML file with environment variables as the base layer
//! let config = FlowTTSConfig::from_file(Path::new("flow-tts.yaml"))?;
//! # Ok(())
//! # }
//! ```

use std::env;
use std::fmt;
use std::path::Path;

use url::Url;

use crate::core::signer::Credentials;
use crate::error::{FlowTTSError, FlowTTSResult};

mod yaml;

pub use yaml::{TencentYaml, TrtcYaml, YamlConfig};

/// Default Tencent Cloud region
pub const DEFAULT_REGION: &str = "ap-beijing";

/// Default API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://trtc.ai.tencentcloudapi.com/";

pub const ENV_SECRET_ID: &str = "TX_SECRET_ID";
pub const ENV_SECRET_KEY: &str = "TX_SECRET_KEY";
pub const ENV_SDK_APP_ID: &str = "TRTC_SDK_APP_ID";
pub const ENV_REGION: &str = "TX_REGION";
pub const ENV_ENDPOINT: &str = "FLOW_TTS_ENDPOINT";

/// FlowTTS client configuration
#[derive(Clone, PartialEq, Eq)]
pub struct FlowTTSConfig {
    /// Tencent Cloud SecretId
    pub secret_id: String,
    /// Tencent Cloud SecretKey. Never logged.
    pub secret_key: String,
    /// TRTC application id
    pub sdk_app_id: u64,
    /// Region sent in `X-TC-Region`
    pub region: String,
    /// Endpoint URL requests are posted to
    pub endpoint: String,
}

impl fmt::Debug for FlowTTSConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowTTSConfig")
            .field("secret_id", &self.secret_id)
            .field("secret_key", &"<redacted>")
            .field("sdk_app_id", &self.sdk_app_id)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl FlowTTSConfig {
    /// Create a configuration with the default region and endpoint
    pub fn new(
        secret_id: impl Into<String>,
        secret_key: impl Into<String>,
        sdk_app_id: u64,
    ) -> Self {
        Self {
            secret_id: secret_id.into(),
            secret_key: secret_key.into(),
            sdk_app_id,
            region: DEFAULT_REGION.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if a required variable is missing, has an
    /// invalid format, or validation fails.
    pub fn from_env() -> FlowTTSResult<Self> {
        Self::merge(None)
    }

    /// Load configuration from a YAML file layered over environment variables
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if the file cannot be read or parsed, a
    /// required value is missing from both sources, or validation fails.
    pub fn from_file(path: &Path) -> FlowTTSResult<Self> {
        let yaml = YamlConfig::from_file(path)?;
        Self::merge(Some(yaml))
    }

    fn merge(yaml: Option<YamlConfig>) -> FlowTTSResult<Self> {
        let yaml = yaml.unwrap_or_default();
        let tencent = yaml.tencent.unwrap_or_default();
        let trtc = yaml.trtc.unwrap_or_default();

        let secret_id = non_empty(tencent.secret_id)
            .or_else(|| env_var(ENV_SECRET_ID))
            .ok_or_else(|| missing(ENV_SECRET_ID, "tencent.secret_id"))?;
        let secret_key = non_empty(tencent.secret_key)
            .or_else(|| env_var(ENV_SECRET_KEY))
            .ok_or_else(|| missing(ENV_SECRET_KEY, "tencent.secret_key"))?;

        let sdk_app_id = match trtc.sdk_app_id {
            Some(id) => id,
            None => {
                let raw = env_var(ENV_SDK_APP_ID)
                    .ok_or_else(|| missing(ENV_SDK_APP_ID, "trtc.sdk_app_id"))?;
                raw.trim().parse::<u64>().map_err(|e| {
                    FlowTTSError::InvalidConfiguration(format!(
                        "Invalid {ENV_SDK_APP_ID} value '{raw}': {e}"
                    ))
                })?
            }
        };

        let region = non_empty(tencent.region)
            .or_else(|| env_var(ENV_REGION))
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        let endpoint = non_empty(trtc.endpoint)
            .or_else(|| env_var(ENV_ENDPOINT))
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let config = Self {
            secret_id,
            secret_key,
            sdk_app_id,
            region,
            endpoint,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> FlowTTSResult<()> {
        if self.secret_id.trim().is_empty() || self.secret_key.trim().is_empty() {
            return Err(FlowTTSError::InvalidConfiguration(
                "Missing required credentials: secret_id and secret_key".to_string(),
            ));
        }
        if self.sdk_app_id == 0 {
            return Err(FlowTTSError::InvalidConfiguration(
                "Invalid sdk_app_id: must be a positive integer".to_string(),
            ));
        }
        if self.region.trim().is_empty() {
            return Err(FlowTTSError::InvalidConfiguration(
                "Region must not be empty".to_string(),
            ));
        }
        self.endpoint_url()?;
        Ok(())
    }

    /// Parsed endpoint URL (http or https)
    pub fn endpoint_url(&self) -> FlowTTSResult<Url> {
        let url = Url::parse(&self.endpoint).map_err(|e| {
            FlowTTSError::InvalidConfiguration(format!("Invalid endpoint '{}': {e}", self.endpoint))
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(FlowTTSError::InvalidConfiguration(format!(
                "Invalid endpoint scheme '{scheme}': expected http or https"
            ))),
        }
    }

    /// Credentials for request signing
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.secret_id.clone(), self.secret_key.clone())
    }
}

fn env_var(name: &str) -> Option<String> {
    non_empty(env::var(name).ok())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn missing(env_name: &str, yaml_key: &str) -> FlowTTSError {
    FlowTTSError::InvalidConfiguration(format!(
        "{env_name} environment variable (or {yaml_key} in YAML) is required"
    ))
}
