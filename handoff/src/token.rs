//! Scoped, time-bounded access credentials for the shared call.
//!
//! Mints LiveKit-compatible HS256 JWTs: the token carries a video grant
//! bound to exactly one room, so it can be validated without any external
//! lookup and cannot open any other session. Two grant shapes exist:
//! the operator grant (join + publish + subscribe) handed to the human,
//! and the admin grant the session backend uses for server API calls.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::detector::OPERATOR_NAMESPACE;
use crate::error::HandoffError;

/// Token validity window. Matches the LiveKit SDK default.
const TOKEN_TTL_SECS: i64 = 6 * 3600;

/// Display name attached to the operator credential.
const OPERATOR_DISPLAY_NAME: &str = "Human Support Agent";

/// Identity used for server-API (admin) tokens.
const ADMIN_IDENTITY: &str = "session-coordinator";

/// API key/secret pair used to sign access tokens.
///
/// Validated at construction: empty signing material is a startup-class
/// configuration error, never retried.
#[derive(Debug, Clone)]
pub struct SigningCredentials {
    api_key: String,
    api_secret: String,
}

impl SigningCredentials {
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Result<Self, HandoffError> {
        let api_key = api_key.into();
        let api_secret = api_secret.into();
        if api_key.trim().is_empty() || api_secret.trim().is_empty() {
            return Err(HandoffError::Configuration(
                "signing key and secret must be non-empty".into(),
            ));
        }
        Ok(Self {
            api_key,
            api_secret,
        })
    }
}

/// Capability flags scoped to a single room, serialized into the token's
/// `video` claim using LiveKit's field names.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoGrant {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub room_join: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub can_publish: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub can_subscribe: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub room_create: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub room_admin: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    sub: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    nbf: i64,
    exp: i64,
    video: VideoGrant,
}

/// A minted operator credential: the signed token plus the generated
/// subject identity. Immutable once issued; never persisted.
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    pub token: String,
    pub identity: String,
}

/// Mints signed, room-scoped access tokens.
///
/// Pure and synchronous; holds no shared state beyond the signing material.
#[derive(Debug, Clone)]
pub struct AccessTokenIssuer {
    credentials: SigningCredentials,
}

impl AccessTokenIssuer {
    pub fn new(credentials: SigningCredentials) -> Self {
        Self { credentials }
    }

    /// Mint a join+publish+subscribe credential for a human operator,
    /// scoped to `room`.
    ///
    /// The subject identity is `human-agent-<timestamp>`, unique per
    /// escalation and recognizable by the arrival detector.
    pub fn issue_operator_token(&self, room: &str) -> Result<IssuedCredential, HandoffError> {
        let now = Utc::now();
        let identity = mint_operator_identity(now);
        let grant = VideoGrant {
            room: Some(room.to_string()),
            room_join: true,
            can_publish: true,
            can_subscribe: true,
            ..VideoGrant::default()
        };
        let token = self.sign(&identity, Some(OPERATOR_DISPLAY_NAME), grant, now)?;
        debug!(room, identity, "operator credential issued");
        Ok(IssuedCredential { token, identity })
    }

    /// Mint a server-API credential (`roomCreate` + `roomAdmin`) scoped to
    /// `room`, used by the session backend for RoomService calls.
    pub fn issue_admin_token(&self, room: &str) -> Result<String, HandoffError> {
        let grant = VideoGrant {
            room: Some(room.to_string()),
            room_create: true,
            room_admin: true,
            ..VideoGrant::default()
        };
        self.sign(ADMIN_IDENTITY, None, grant, Utc::now())
    }

    /// Verify a token's signature and check whether it authorizes joining
    /// `room`. A credential issued for one session never authorizes
    /// another (scope confinement).
    pub fn authorizes_room(&self, token: &str, room: &str) -> Result<bool, HandoffError> {
        let key = DecodingKey::from_secret(self.credentials.api_secret.as_bytes());
        let claims = jsonwebtoken::decode::<Claims>(token, &key, &Validation::new(Algorithm::HS256))
            .map_err(|e| HandoffError::Issuance(format!("token validation failed: {e}")))?
            .claims;
        Ok(claims.video.room_join && claims.video.room.as_deref() == Some(room))
    }

    fn sign(
        &self,
        identity: &str,
        name: Option<&str>,
        video: VideoGrant,
        now: DateTime<Utc>,
    ) -> Result<String, HandoffError> {
        let claims = Claims {
            iss: self.credentials.api_key.clone(),
            sub: identity.to_string(),
            name: name.map(String::from),
            nbf: now.timestamp(),
            exp: now.timestamp() + TOKEN_TTL_SECS,
            video,
        };
        let key = EncodingKey::from_secret(self.credentials.api_secret.as_bytes());
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &key)
            .map_err(|e| HandoffError::Issuance(format!("token signing failed: {e}")))
    }
}

/// Generate a unique operator identity from a timestamp.
fn mint_operator_identity(now: DateTime<Utc>) -> String {
    format!("{OPERATOR_NAMESPACE}-{}", now.format("%Y%m%d_%H%M%S"))
}

/// Compose the meeting join URL for an operator credential.
///
/// Both query parameters are URL-encoded and emitted in a fixed order
/// (`liveKitUrl` first) so the output is reproducible.
pub fn join_url(meet_url: &str, ws_url: &str, token: &str) -> String {
    format!(
        "{meet_url}?liveKitUrl={}&token={}",
        urlencoding::encode(ws_url),
        urlencoding::encode(token)
    )
}
