// self
use crate::{
	_prelude::*,
	config::{ClientConfig, CsrfSettings, Endpoints},
	error::ConfigError,
	poll::PollConfig,
};

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// API root every endpoint path is joined onto.
	pub base_url: Url,
	/// Endpoint paths.
	pub endpoints: Endpoints,
	/// CSRF cookie/header names.
	pub csrf: CsrfSettings,
	/// Per-request deadline.
	pub timeout: Duration,
	/// Poll defaults.
	pub poll: PollConfig,
}
impl ClientConfigBuilder {
	/// Creates a new builder seeded with the provided API root.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			endpoints: Endpoints::default(),
			csrf: CsrfSettings::default(),
			timeout: ClientConfig::DEFAULT_TIMEOUT,
			poll: PollConfig::default(),
		}
	}

	/// Overrides the endpoint table.
	pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
		self.endpoints = endpoints;

		self
	}

	/// Overrides the CSRF cookie name.
	pub fn csrf_cookie_name(mut self, name: impl Into<String>) -> Self {
		self.csrf.cookie_name = name.into();

		self
	}

	/// Overrides the CSRF header name.
	pub fn csrf_header_name(mut self, name: impl Into<String>) -> Self {
		self.csrf.header_name = name.into();

		self
	}

	/// Overrides the per-request deadline.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Overrides the poll defaults.
	pub fn poll(mut self, poll: PollConfig) -> Self {
		self.poll = poll;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let config = ClientConfig {
			base_url: self.base_url,
			endpoints: self.endpoints,
			csrf: self.csrf,
			timeout: self.timeout,
			poll: self.poll,
		};

		config.validate()?;

		Ok(config)
	}
}

impl ClientConfig {
	/// Validates invariants for the configuration.
	pub fn validate(&self) -> Result<(), ConfigError> {
		match self.base_url.scheme() {
			"http" | "https" => {},
			other => return Err(ConfigError::UnsupportedScheme { scheme: other.to_owned() }),
		}
		if self.base_url.cannot_be_a_base() {
			return Err(ConfigError::CannotBeABase { url: self.base_url.to_string() });
		}
		if !self.timeout.is_positive() {
			return Err(ConfigError::NonPositiveTimeout);
		}

		self.poll.validate()?;
		self.csrf_header()?;
		validate_cookie_name(&self.csrf.cookie_name)?;

		for path in [
			&self.endpoints.login,
			&self.endpoints.refresh,
			&self.endpoints.logout,
			&self.endpoints.register,
			&self.endpoints.verify,
			&self.endpoints.csrf,
		] {
			self.url_for(path)?;
		}

		Ok(())
	}
}

fn validate_cookie_name(name: &str) -> Result<(), ConfigError> {
	let invalid = name.is_empty()
		|| name.chars().any(|c| c.is_whitespace() || c.is_control() || matches!(c, '=' | ';' | ','));

	if invalid { Err(ConfigError::InvalidCookieName { name: name.to_owned() }) } else { Ok(()) }
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Failed to parse fixture URL.")
	}

	#[test]
	fn builder_rejects_unusable_settings() {
		let err = ClientConfig::builder(url("ftp://example.com/api/"))
			.build()
			.expect_err("Non-http schemes should be rejected.");

		assert!(matches!(err, ConfigError::UnsupportedScheme { ref scheme } if scheme == "ftp"));

		let err = ClientConfig::builder(url("mailto:ops@example.com"))
			.build()
			.expect_err("Mail URLs should be rejected.");

		assert!(matches!(err, ConfigError::UnsupportedScheme { .. }));

		let err = ClientConfig::builder(url("http://localhost:8000/api/"))
			.csrf_header_name("X CSRF")
			.build()
			.expect_err("Header names with spaces should be rejected.");

		assert!(matches!(err, ConfigError::InvalidHeaderName { .. }));

		let err = ClientConfig::builder(url("http://localhost:8000/api/"))
			.csrf_cookie_name("csrf;token")
			.build()
			.expect_err("Cookie names with separators should be rejected.");

		assert!(matches!(err, ConfigError::InvalidCookieName { .. }));

		let err = ClientConfig::builder(url("http://localhost:8000/api/"))
			.timeout(Duration::ZERO)
			.build()
			.expect_err("Zero timeouts should be rejected.");

		assert!(matches!(err, ConfigError::NonPositiveTimeout));
	}

	#[test]
	fn builder_applies_overrides() {
		let config = ClientConfig::builder(url("https://news.example.com/api/"))
			.csrf_cookie_name("xsrf")
			.csrf_header_name("X-XSRF-Token")
			.timeout(Duration::seconds(3))
			.build()
			.expect("Overrides should produce a valid config.");

		assert_eq!(config.csrf.cookie_name, "xsrf");
		assert_eq!(config.csrf_header().expect("Header should parse.").as_str(), "x-xsrf-token");
		assert_eq!(config.timeout, Duration::seconds(3));
	}
}
