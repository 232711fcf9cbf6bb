//! Session token storage: an authoritative in-memory slot pair with an optional persisted
//! fallback used to survive restarts.

pub mod file;

pub use file::FilePersistence;

// self
use crate::{
	_prelude::*,
	auth::{AccessClaims, CredentialPair, TokenSecret},
	obs,
};

/// Persistence contract for the token fallback.
///
/// Implementations are called synchronously while the store's write lock is held, so the
/// persisted snapshot always matches the latest in-memory state.
pub trait TokenPersistence
where
	Self: Send + Sync,
{
	/// Loads the last persisted snapshot.
	fn load(&self) -> Result<TokenSnapshot, StoreError>;

	/// Replaces the persisted snapshot.
	fn save(&self, snapshot: &TokenSnapshot) -> Result<(), StoreError>;
}

/// Error type produced by [`TokenPersistence`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage medium.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Access/refresh slots as held in memory and persisted by the fallback.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSnapshot {
	/// Access token slot.
	pub access: Option<TokenSecret>,
	/// Refresh token slot.
	pub refresh: Option<TokenSecret>,
}
impl TokenSnapshot {
	/// Returns `true` when both slots are empty.
	pub fn is_empty(&self) -> bool {
		self.access.is_none() && self.refresh.is_none()
	}
}

/// Process-wide credential holder owned by one client session.
///
/// Every mutation is written through to the fallback (when configured); persistence failures
/// are logged and swallowed so the in-memory copy remains authoritative.
#[derive(Default)]
pub struct TokenStore {
	slots: RwLock<TokenSnapshot>,
	fallback: Option<Arc<dyn TokenPersistence>>,
}
impl TokenStore {
	/// Creates a store without persistence.
	pub fn in_memory() -> Self {
		Self::default()
	}

	/// Creates a store backed by `fallback`, hydrating the slots from its last snapshot.
	///
	/// An unreadable snapshot is logged and treated as empty.
	pub fn with_fallback(fallback: Arc<dyn TokenPersistence>) -> Self {
		let snapshot = fallback.load().unwrap_or_else(|err| {
			obs::persistence_failed("load", &err);

			TokenSnapshot::default()
		});

		Self { slots: RwLock::new(snapshot), fallback: Some(fallback) }
	}

	/// Returns the current access token.
	pub fn access(&self) -> Option<TokenSecret> {
		self.slots.read().access.clone()
	}

	/// Replaces (or clears) the access token.
	pub fn set_access(&self, token: Option<TokenSecret>) {
		self.mutate(|slots| slots.access = token);
	}

	/// Returns the current refresh token.
	pub fn refresh(&self) -> Option<TokenSecret> {
		self.slots.read().refresh.clone()
	}

	/// Replaces (or clears) the refresh token.
	pub fn set_refresh(&self, token: Option<TokenSecret>) {
		self.mutate(|slots| slots.refresh = token);
	}

	/// Stores both tokens of a freshly issued pair.
	pub fn set_pair(&self, pair: CredentialPair) {
		self.mutate(|slots| {
			slots.access = Some(pair.access);
			slots.refresh = Some(pair.refresh);
		});
	}

	/// Clears both tokens.
	pub fn clear_all(&self) {
		self.mutate(|slots| *slots = TokenSnapshot::default());
	}

	/// Returns a copy of both slots.
	pub fn snapshot(&self) -> TokenSnapshot {
		self.slots.read().clone()
	}

	/// Decodes the current access token's claims; `None` when absent or not a JWT.
	pub fn access_claims(&self) -> Option<AccessClaims> {
		self.access().and_then(|token| AccessClaims::decode(&token).ok())
	}

	fn mutate(&self, f: impl FnOnce(&mut TokenSnapshot)) {
		let mut slots = self.slots.write();

		f(&mut slots);

		let Some(fallback) = self.fallback.as_ref() else {
			return;
		};

		if let Err(err) = fallback.save(&slots) {
			obs::persistence_failed("save", &err);
		}
	}
}
impl Debug for TokenStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let slots = self.slots.read();

		f.debug_struct("TokenStore")
			.field("access_set", &slots.access.is_some())
			.field("refresh_set", &slots.refresh.is_some())
			.field("persistent", &self.fallback.is_some())
			.finish()
	}
}
