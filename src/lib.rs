//! Authenticated request pipeline for the NewsTrader API: bearer tokens, CSRF double-submit
//! headers, single-flight token refresh with request queuing, and analysis job polling.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod csrf;
pub mod decorate;
pub mod error;
pub mod obs;
pub mod poll;
pub mod refresh;
pub mod store;
pub mod transport;

#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		client::{ApiClient, SessionEvent, SessionObserver},
		config::ClientConfig,
		csrf::CookieJarCsrf,
		store::TokenStore,
		transport::ReqwestTransport,
	};

	/// Client type alias used by reqwest-backed integration tests.
	pub type ReqwestTestClient = ApiClient<ReqwestTransport>;

	/// Observer that records every [`SessionEvent`] for later assertions.
	#[derive(Debug, Default)]
	pub struct RecordingObserver(Mutex<Vec<SessionEvent>>);
	impl RecordingObserver {
		/// Returns a snapshot of the recorded events.
		pub fn events(&self) -> Vec<SessionEvent> {
			self.0.lock().clone()
		}
	}
	impl SessionObserver for RecordingObserver {
		fn notify(&self, event: SessionEvent) {
			self.0.lock().push(event);
		}
	}

	/// Builds a reqwest-backed client pointed at `base_url`, returning the client, its token
	/// store, and the observer receiving session events.
	pub fn build_reqwest_test_client(
		base_url: &str,
	) -> (ReqwestTestClient, Arc<TokenStore>, Arc<RecordingObserver>) {
		let config = ClientConfig::builder(
			Url::parse(base_url).expect("Test base URL should parse successfully."),
		)
		.build()
		.expect("Test client configuration should be valid.");
		let transport = ReqwestTransport::new(&config)
			.expect("Failed to build reqwest transport for integration tests.");
		let csrf = CookieJarCsrf::new(transport.cookie_jar(), &config);
		let store = Arc::new(TokenStore::in_memory());
		let observer = Arc::new(RecordingObserver::default());
		let client = ApiClient::<ReqwestTransport>::builder(config, transport)
			.store(store.clone())
			.csrf(Arc::new(csrf))
			.observer(observer.clone())
			.build()
			.expect("Test API client should build.");

		(client, store, observer)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap, VecDeque},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
