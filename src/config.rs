//! Client configuration: API base URL, endpoint paths, CSRF names, timeouts, and poll defaults.
//!
//! Values are validated once by [`ClientConfigBuilder::build`] so the pipeline can join
//! endpoint paths and build header names without further error handling.

/// Builder API for assembling client configurations.
pub mod builder;
/// Endpoint path table.
pub mod endpoints;

pub use builder::*;
pub use endpoints::*;

// self
use crate::{_prelude::*, error::ConfigError, poll::PollConfig};

/// Cookie and header names used for the CSRF double-submit exchange.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsrfSettings {
	/// Cookie the server sets on session start.
	pub cookie_name: String,
	/// Header echoing the cookie on mutating requests.
	pub header_name: String,
}
impl Default for CsrfSettings {
	fn default() -> Self {
		Self { cookie_name: "csrftoken".into(), header_name: "X-CSRFToken".into() }
	}
}

/// Immutable client configuration consumed by the pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
	/// API root every endpoint path is joined onto.
	pub base_url: Url,
	/// Endpoint paths relative to [`ClientConfig::base_url`].
	#[serde(default)]
	pub endpoints: Endpoints,
	/// CSRF cookie/header names.
	#[serde(default)]
	pub csrf: CsrfSettings,
	/// Per-request deadline enforced by the transport.
	#[serde(default = "default_timeout")]
	pub timeout: Duration,
	/// Defaults for analysis job polling.
	#[serde(default)]
	pub poll: PollConfig,
}
impl ClientConfig {
	/// Default per-request deadline.
	pub const DEFAULT_TIMEOUT: Duration = Duration::seconds(10);

	/// Creates a new builder for the provided API root.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Resolves an endpoint path against the base URL.
	///
	/// Leading slashes are treated as relative to the base path so `/token/` under
	/// `http://host/api/` resolves to `http://host/api/token/`.
	pub fn url_for(&self, path: &str) -> Result<Url, ConfigError> {
		let mut base = self.base_url.clone();

		if !base.path().ends_with('/') {
			let with_slash = format!("{}/", base.path());

			base.set_path(&with_slash);
		}

		base.join(path.trim_start_matches('/'))
			.map_err(|source| ConfigError::InvalidEndpoint { path: path.to_owned(), source })
	}

	/// Returns the CSRF header name as a typed header.
	pub fn csrf_header(&self) -> Result<http::HeaderName, ConfigError> {
		http::HeaderName::from_bytes(self.csrf.header_name.as_bytes())
			.map_err(|_| ConfigError::InvalidHeaderName { name: self.csrf.header_name.clone() })
	}
}

fn default_timeout() -> Duration {
	ClientConfig::DEFAULT_TIMEOUT
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn config(base: &str) -> ClientConfig {
		ClientConfig::builder(Url::parse(base).expect("Fixture URL should parse."))
			.build()
			.expect("Fixture config should be valid.")
	}

	#[test]
	fn url_for_keeps_base_path() {
		let with_slash = config("http://localhost:8000/api/");
		let without_slash = config("http://localhost:8000/api");

		assert_eq!(
			with_slash.url_for("/token/refresh/").expect("Endpoint should join.").as_str(),
			"http://localhost:8000/api/token/refresh/"
		);
		assert_eq!(
			without_slash.url_for("news/42/").expect("Endpoint should join.").as_str(),
			"http://localhost:8000/api/news/42/"
		);
	}

	#[test]
	fn config_loads_from_json_with_defaults() {
		let config: ClientConfig =
			serde_json::from_str(r#"{"base_url":"https://news.example.com/api/"}"#)
				.expect("Minimal config should deserialize.");

		assert_eq!(config.csrf, CsrfSettings::default());
		assert_eq!(config.endpoints, Endpoints::default());
		assert_eq!(config.timeout, ClientConfig::DEFAULT_TIMEOUT);
		assert_eq!(config.poll, PollConfig::default());
	}
}
