//! JSON-file [`TokenPersistence`] for sessions that should survive a restart.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::store::{StoreError, TokenPersistence, TokenSnapshot};

/// Persists the token snapshot to a JSON file, replacing it atomically on every save.
///
/// An empty snapshot removes the file so a logged-out session leaves nothing behind.
#[derive(Clone, Debug)]
pub struct FilePersistence {
	path: PathBuf,
}
impl FilePersistence {
	/// Prepares persistence at `path`, creating parent directories eagerly.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		Ok(Self { path })
	}

	/// Location of the snapshot file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create token directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn write_atomically(&self, bytes: &[u8]) -> Result<(), StoreError> {
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(bytes).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl TokenPersistence for FilePersistence {
	fn load(&self) -> Result<TokenSnapshot, StoreError> {
		if !self.path.exists() {
			return Ok(TokenSnapshot::default());
		}

		let bytes = fs::read(&self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", self.path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(TokenSnapshot::default());
		}

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", self.path.display()),
		})
	}

	fn save(&self, snapshot: &TokenSnapshot) -> Result<(), StoreError> {
		if snapshot.is_empty() {
			return match fs::remove_file(&self.path) {
				Ok(()) => Ok(()),
				Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
				Err(e) => Err(StoreError::Backend {
					message: format!("Failed to remove {}: {e}", self.path.display()),
				}),
			};
		}

		Self::ensure_parent_exists(&self.path)?;

		let serialized = serde_json::to_vec_pretty(snapshot).map_err(|e| {
			StoreError::Serialization { message: format!("Failed to serialize tokens: {e}") }
		})?;

		self.write_atomically(&serialized)
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// self
	use super::*;
	use crate::{
		_prelude::*,
		auth::{CredentialPair, TokenSecret},
		store::TokenStore,
	};

	fn temp_path() -> PathBuf {
		let unique = format!(
			"news_trader_tokens_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[test]
	fn tokens_survive_reopen_and_logout_removes_file() {
		let path = temp_path();
		let persistence =
			Arc::new(FilePersistence::open(&path).expect("Failed to prepare token file."));
		let store = TokenStore::with_fallback(persistence);

		store.set_pair(CredentialPair::new("access-file", "refresh-file"));
		drop(store);

		let reopened = TokenStore::with_fallback(Arc::new(
			FilePersistence::open(&path).expect("Failed to reopen token file."),
		));

		assert_eq!(reopened.access().as_ref().map(TokenSecret::expose), Some("access-file"));
		assert_eq!(reopened.refresh().as_ref().map(TokenSecret::expose), Some("refresh-file"));

		reopened.clear_all();

		assert!(!path.exists(), "Clearing the session should remove the snapshot file.");
	}

	#[test]
	fn corrupt_snapshot_reports_serialization_error() {
		let path = temp_path();

		fs::write(&path, b"not json").expect("Failed to write corrupt fixture.");

		let persistence = FilePersistence::open(&path).expect("Failed to prepare token file.");

		assert!(matches!(persistence.load(), Err(StoreError::Serialization { .. })));

		let store = TokenStore::with_fallback(Arc::new(persistence));

		assert!(store.access().is_none(), "Corrupt snapshots hydrate as empty.");

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary token snapshot {}: {e}", path.display())
		});
	}
}
