//! Auth-domain identifiers, redacted secrets, credential pairs, and access-token claims.

pub mod claims;
pub mod id;
pub mod secret;

pub use claims::*;
pub use id::*;
pub use secret::*;

// self
use crate::_prelude::*;

/// Access/refresh token pair issued by the login endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
	/// Short-lived bearer credential.
	pub access: TokenSecret,
	/// Longer-lived credential exchanged for new access tokens.
	pub refresh: TokenSecret,
}
impl CredentialPair {
	/// Creates a pair from raw token strings.
	pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
		Self { access: TokenSecret::new(access), refresh: TokenSecret::new(refresh) }
	}

	/// Decodes the access token's claims without verifying them.
	pub fn claims(&self) -> Result<AccessClaims, ClaimsError> {
		AccessClaims::decode(&self.access)
	}
}
