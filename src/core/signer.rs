//! TC3-HMAC-SHA256 request signing.
//!
//! The remote verifier recomputes the signature independently, so every byte of
//! the canonical request and the string-to-sign has to match exactly:
//!
//! ```text
//! CanonicalRequest =
//!     "POST" \n "/" \n "" \n
//!     "content-type:application/json; charset=utf-8\n"
//!     "host:trtc.ai.tencentcloudapi.com\n"
//!     "x-tc-action:{action lower-cased}\n" \n
//!     "content-type;host;x-tc-action" \n
//!     hex(sha256(payload))
//!
//! StringToSign =
//!     "TC3-HMAC-SHA256" \n timestamp \n "{date}/trtc/tc3_request" \n
//!     hex(sha256(CanonicalRequest))
//!
//! kDate    = HMAC("TC3" + secret, date)
//! kService = HMAC(kDate, "trtc")
//! kSigning = HMAC(kService, "tc3_request")
//! Signature = hex(HMAC(kSigning, StringToSign))
//! ```
//!
//! The intermediate keys are raw 32-byte digests. Hex-encoding any of them before
//! feeding it into the next step yields a well-formed but wrong signature.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{FlowTTSError, FlowTTSResult};

type HmacSha256 = Hmac<Sha256>;

// =============================================================================
// Constants
// =============================================================================

/// Signing algorithm tag.
pub const ALGORITHM: &str = "TC3-HMAC-SHA256";

/// Service identifier used in the credential scope.
pub const SERVICE: &str = "trtc";

/// Credential scope terminator.
pub const REQUEST_SUFFIX: &str = "tc3_request";

/// API host, also part of the canonical headers.
pub const API_HOST: &str = "trtc.ai.tencentcloudapi.com";

/// API version sent in `X-TC-Version`.
pub const API_VERSION: &str = "2019-07-22";

/// Request content type, also part of the canonical headers.
pub const CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Signed header list. Fixed regardless of the action name.
pub const SIGNED_HEADERS: &str = "content-type;host;x-tc-action";

/// Action for single-shot synthesis.
pub const ACTION_TEXT_TO_SPEECH: &str = "TextToSpeech";

/// Action for SSE streaming synthesis.
pub const ACTION_TEXT_TO_SPEECH_SSE: &str = "TextToSpeechSSE";

// =============================================================================
// Credentials
// =============================================================================

/// API credentials. The secret is wiped from memory on drop and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    secret_id: String,
    secret_key: String,
}

impl Credentials {
    pub fn new(secret_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            secret_id: secret_id.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Public identity placed in the `Credential=` field.
    pub fn secret_id(&self) -> &str {
        &self.secret_id
    }

    pub(crate) fn secret_key(&self) -> &str {
        &self.secret_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("secret_id", &self.secret_id)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Signed Output
// =============================================================================

/// Headers required by the endpoint, in the order they are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    /// Value of the `Authorization` header.
    pub authorization: String,
    /// Full header set including `Authorization`.
    pub headers: Vec<(&'static str, String)>,
}

impl SignedHeaders {
    /// Look up a header value by exact name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

// =============================================================================
// Signer
// =============================================================================

/// Stateless TC3 signer bound to one set of credentials.
#[derive(Debug, Clone)]
pub struct Tc3Signer {
    credentials: Credentials,
}

impl Tc3Signer {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Sign a request using the current wall-clock time.
    pub fn sign(&self, action: &str, region: &str, payload: &[u8]) -> FlowTTSResult<SignedHeaders> {
        self.sign_at(action, region, payload, unix_timestamp())
    }

    /// Sign a request at a fixed unix timestamp (seconds).
    pub fn sign_at(
        &self,
        action: &str,
        region: &str,
        payload: &[u8],
        timestamp: i64,
    ) -> FlowTTSResult<SignedHeaders> {
        let date = utc_date(timestamp);
        let scope = credential_scope(&date);

        let canonical = canonical_request(action, payload);
        let to_sign = string_to_sign(timestamp, &scope, &canonical);

        let signing_key = derive_signing_key(self.credentials.secret_key(), &date)?;
        let signature = hex::encode(hmac_sha256(&signing_key, to_sign.as_bytes())?);

        let authorization = format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={SIGNED_HEADERS}, Signature={signature}",
            self.credentials.secret_id()
        );

        Ok(SignedHeaders {
            headers: vec![
                ("Content-Type", CONTENT_TYPE.to_string()),
                ("Host", API_HOST.to_string()),
                ("X-TC-Action", action.to_string()),
                ("X-TC-Timestamp", timestamp.to_string()),
                ("X-TC-Version", API_VERSION.to_string()),
                ("X-TC-Region", region.to_string()),
                ("Authorization", authorization.clone()),
            ],
            authorization,
        })
    }
}

// =============================================================================
// Signing Steps
// =============================================================================

/// Canonical header block. Always ends with a single `\n`.
pub fn canonical_headers(action: &str) -> String {
    format!(
        "content-type:{CONTENT_TYPE}\nhost:{API_HOST}\nx-tc-action:{}\n",
        action.to_lowercase()
    )
}

/// Canonical request string for a POST to `/` with an empty query string.
pub fn canonical_request(action: &str, payload: &[u8]) -> String {
    [
        "POST",
        "/",
        "",
        &canonical_headers(action),
        SIGNED_HEADERS,
        &sha256_hex(payload),
    ]
    .join("\n")
}

/// `{date}/trtc/tc3_request`
pub fn credential_scope(date: &str) -> String {
    format!("{date}/{SERVICE}/{REQUEST_SUFFIX}")
}

pub fn string_to_sign(timestamp: i64, scope: &str, canonical_request: &str) -> String {
    [
        ALGORITHM,
        &timestamp.to_string(),
        scope,
        &sha256_hex(canonical_request.as_bytes()),
    ]
    .join("\n")
}

/// Derive `kSigning` from the secret key and the UTC date.
pub fn derive_signing_key(secret_key: &str, date: &str) -> FlowTTSResult<[u8; 32]> {
    let k_date = hmac_sha256(format!("TC3{secret_key}").as_bytes(), date.as_bytes())?;
    let k_service = hmac_sha256(&k_date, SERVICE.as_bytes())?;
    hmac_sha256(&k_service, REQUEST_SUFFIX.as_bytes())
}

pub(crate) fn hmac_sha256(key: &[u8], message: &[u8]) -> FlowTTSResult<[u8; 32]> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| {
        FlowTTSError::InvalidConfiguration(format!("HMAC initialization failed: {e}"))
    })?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().into())
}

pub(crate) fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// `YYYY-MM-DD` in UTC for a unix timestamp.
pub fn utc_date(timestamp: i64) -> String {
    let date = OffsetDateTime::from_unix_timestamp(timestamp)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
        .date();
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default()
}
