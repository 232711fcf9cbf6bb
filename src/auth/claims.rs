//! Unverified access-token claims; the server remains the authority on validity.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::{_prelude::*, auth::TokenSecret};

/// Errors raised while decoding an access token payload.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ClaimsError {
	/// Token does not have the `header.payload.signature` shape.
	#[error("Access token is not a JWT.")]
	Malformed,
	/// Payload segment is not valid base64url.
	#[error("Access token payload is not valid base64url.")]
	Encoding,
	/// Payload is not the expected JSON object.
	#[error("Access token payload is invalid: {message}.")]
	Payload {
		/// Parser message.
		message: String,
	},
	/// `exp` is outside the representable range.
	#[error("Access token expiry is out of range.")]
	ExpiryOutOfRange,
}

#[derive(Deserialize)]
struct RawClaims {
	user_id: Option<serde_json::Value>,
	sub: Option<serde_json::Value>,
	username: Option<String>,
	exp: Option<i64>,
}

/// Claims carried by an access token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessClaims {
	/// Subject identifier (`user_id` or `sub`), rendered as a string.
	pub subject: Option<String>,
	/// Username claim, when the server includes one.
	pub username: Option<String>,
	/// Expiry instant, when present.
	pub expires_at: Option<OffsetDateTime>,
}
impl AccessClaims {
	/// Decodes the payload segment of `token` without checking its signature.
	pub fn decode(token: &TokenSecret) -> Result<Self, ClaimsError> {
		let mut segments = token.expose().split('.');
		let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
			(Some(_), Some(payload), Some(_), None) if !payload.is_empty() => payload,
			_ => return Err(ClaimsError::Malformed),
		};
		let bytes = URL_SAFE_NO_PAD
			.decode(payload.trim_end_matches('='))
			.map_err(|_| ClaimsError::Encoding)?;
		let raw: RawClaims = serde_json::from_slice(&bytes)
			.map_err(|e| ClaimsError::Payload { message: e.to_string() })?;
		let subject =
			raw.user_id.and_then(render_subject).or_else(|| raw.sub.and_then(render_subject));
		let expires_at = raw
			.exp
			.map(OffsetDateTime::from_unix_timestamp)
			.transpose()
			.map_err(|_| ClaimsError::ExpiryOutOfRange)?;

		Ok(Self { subject, username: raw.username, expires_at })
	}

	/// Returns `true` if the token is past its expiry at `instant`.
	///
	/// Tokens without an `exp` claim are never considered expired locally.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|exp| instant >= exp)
	}
}

fn render_subject(value: serde_json::Value) -> Option<String> {
	match value {
		serde_json::Value::String(s) => Some(s),
		serde_json::Value::Number(n) => Some(n.to_string()),
		_ => None,
	}
}
