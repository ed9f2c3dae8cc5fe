//! The Jwt bearer token.
//!
//! Wire form: `base64url(header_json).base64url(body_json).base64url(signature)`,
//! no padding. The signature covers the first two segments joined by `.`,
//! exactly as they appear in the string.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{AuthError, Result};

/// Fixed `typ` header value.
pub const JWT_TYPE: &str = "JWT";

/// Fixed `cty` header value.
pub const JWT_CONTENT_TYPE: &str = "virgil-jwt;v=1";

/// Prefix of the `iss` claim, followed by the application id.
pub const ISSUER_PREFIX: &str = "virgil-";

/// Prefix of the `sub` claim, followed by the identity.
pub const SUBJECT_PREFIX: &str = "identity-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub kid: String,
    pub typ: String,
    pub cty: String,
}

impl JwtHeader {
    pub fn new(algorithm: impl Into<String>, key_id: impl Into<String>) -> Self {
        Self {
            alg: algorithm.into(),
            kid: key_id.into(),
            typ: JWT_TYPE.to_string(),
            cty: JWT_CONTENT_TYPE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JwtBody {
    pub iss: String,
    pub sub: String,
    /// Issued at, Unix seconds.
    pub iat: i64,
    /// Expires at, Unix seconds.
    pub exp: i64,
    /// Additional data; always a JSON object when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ada: Option<Value>,
}

impl JwtBody {
    pub fn new(
        app_id: &str,
        identity: &str,
        issued_at: i64,
        expires_at: i64,
        additional_data: Option<Value>,
    ) -> Self {
        Self {
            iss: format!("{}{}", ISSUER_PREFIX, app_id),
            sub: format!("{}{}", SUBJECT_PREFIX, identity),
            iat: issued_at,
            exp: expires_at,
            ada: additional_data,
        }
    }

    pub fn app_id(&self) -> Option<&str> {
        self.iss.strip_prefix(ISSUER_PREFIX)
    }

    pub fn identity(&self) -> Option<&str> {
        self.sub.strip_prefix(SUBJECT_PREFIX)
    }
}

/// A signed token.
#[derive(Debug, Clone, PartialEq)]
pub struct Jwt {
    header: JwtHeader,
    body: JwtBody,
    signature: Vec<u8>,
    unsigned_data: String,
}

impl Jwt {
    /// Encode header and body into the `header.body` signing input.
    pub fn signing_input(header: &JwtHeader, body: &JwtBody) -> Result<String> {
        let header_json =
            serde_json::to_vec(header).map_err(|e| AuthError::MalformedToken(e.to_string()))?;
        let body_json =
            serde_json::to_vec(body).map_err(|e| AuthError::MalformedToken(e.to_string()))?;
        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(body_json)
        ))
    }

    /// Assemble a token from parts and a signature over their signing input.
    pub fn from_parts(header: JwtHeader, body: JwtBody, signature: Vec<u8>) -> Result<Self> {
        let unsigned_data = Self::signing_input(&header, &body)?;
        Ok(Self {
            header,
            body,
            signature,
            unsigned_data,
        })
    }

    pub fn header(&self) -> &JwtHeader {
        &self.header
    }

    pub fn body(&self) -> &JwtBody {
        &self.body
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// The bytes the signature covers.
    pub fn unsigned_data(&self) -> &[u8] {
        self.unsigned_data.as_bytes()
    }

    /// The identity this token asserts.
    pub fn identity(&self) -> Option<&str> {
        self.body.identity()
    }

    pub fn expires_at(&self) -> i64 {
        self.body.exp
    }

    /// Expired once the current time reaches `exp`.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_secs())
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.body.exp
    }
}

impl fmt::Display for Jwt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}",
            self.unsigned_data,
            URL_SAFE_NO_PAD.encode(&self.signature)
        )
    }
}

impl FromStr for Jwt {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return Err(AuthError::MalformedToken(format!(
                "expected 3 parts separated by '.', found {}",
                parts.len()
            )));
        }

        let header_json = decode_segment(parts[0], "header")?;
        let body_json = decode_segment(parts[1], "body")?;
        let signature = decode_segment(parts[2], "signature")?;

        let header: JwtHeader = serde_json::from_slice(&header_json)
            .map_err(|e| AuthError::MalformedToken(format!("header: {}", e)))?;
        let body: JwtBody = serde_json::from_slice(&body_json)
            .map_err(|e| AuthError::MalformedToken(format!("body: {}", e)))?;

        Ok(Self {
            header,
            body,
            signature,
            unsigned_data: format!("{}.{}", parts[0], parts[1]),
        })
    }
}

fn decode_segment(segment: &str, what: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| AuthError::MalformedToken(format!("{}: {}", what, e)))
}

/// Current Unix time in seconds.
pub fn now_secs() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
