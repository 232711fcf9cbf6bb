//! CSRF double-submit token lookup.
//!
//! The server sets a CSRF cookie when a session starts; mutating requests must echo it in a
//! header. [`CsrfSource`] hides where the value lives: [`CookieJarCsrf`] reads the jar shared
//! with [`crate::transport::ReqwestTransport`], while [`StaticCsrf`] holds an explicit value for
//! hosts that manage cookies themselves.

// crates.io
use http::Method;
#[cfg(feature = "reqwest")] use reqwest::cookie::{CookieStore, Jar};
// self
#[cfg(feature = "reqwest")] use crate::config::ClientConfig;
use crate::_prelude::*;

/// Methods that must carry the CSRF header.
const MUTATING_METHODS: [&str; 4] = ["POST", "PUT", "PATCH", "DELETE"];

/// Returns `true` when `method` changes server state and needs the CSRF header.
pub fn csrf_required(method: &Method) -> bool {
	MUTATING_METHODS.iter().any(|m| method.as_str().eq_ignore_ascii_case(m))
}

/// Non-empty CSRF token value.
#[derive(Clone, PartialEq, Eq)]
pub struct CsrfToken(String);
impl CsrfToken {
	/// Wraps `value`; blank values are treated as absent.
	pub fn new(value: impl Into<String>) -> Option<Self> {
		let value = value.into();

		if value.trim().is_empty() { None } else { Some(Self(value)) }
	}

	/// Returns the raw token value.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl Debug for CsrfToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("CsrfToken").field(&"<redacted>").finish()
	}
}

/// Read-only view of the current CSRF token.
pub trait CsrfSource
where
	Self: Send + Sync,
{
	/// Returns the token currently visible to the client, if any.
	fn current(&self) -> Option<CsrfToken>;
}

/// [`CsrfSource`] backed by the transport's cookie jar.
#[cfg(feature = "reqwest")]
pub struct CookieJarCsrf {
	jar: Arc<Jar>,
	url: Url,
	cookie_name: String,
}
#[cfg(feature = "reqwest")]
impl CookieJarCsrf {
	/// Reads `config.csrf.cookie_name` from `jar` for cookies scoped to the API root.
	pub fn new(jar: Arc<Jar>, config: &ClientConfig) -> Self {
		Self { jar, url: config.base_url.clone(), cookie_name: config.csrf.cookie_name.clone() }
	}
}
#[cfg(feature = "reqwest")]
impl CsrfSource for CookieJarCsrf {
	fn current(&self) -> Option<CsrfToken> {
		let header = self.jar.cookies(&self.url)?;
		let header = header.to_str().ok()?;

		find_cookie(header, &self.cookie_name).and_then(CsrfToken::new)
	}
}
#[cfg(feature = "reqwest")]
impl Debug for CookieJarCsrf {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CookieJarCsrf")
			.field("url", &self.url.as_str())
			.field("cookie_name", &self.cookie_name)
			.finish()
	}
}

/// [`CsrfSource`] holding an explicitly supplied token.
#[derive(Debug, Default)]
pub struct StaticCsrf(RwLock<Option<CsrfToken>>);
impl StaticCsrf {
	/// Creates a source holding `value`; blank values leave it empty.
	pub fn new(value: impl Into<String>) -> Self {
		Self(RwLock::new(CsrfToken::new(value)))
	}

	/// Replaces the held token; blank values clear it.
	pub fn set(&self, value: impl Into<String>) {
		*self.0.write() = CsrfToken::new(value);
	}

	/// Clears the held token.
	pub fn clear(&self) {
		*self.0.write() = None;
	}
}
impl CsrfSource for StaticCsrf {
	fn current(&self) -> Option<CsrfToken> {
		self.0.read().clone()
	}
}

/// Extracts `name` from a `Cookie` header value (`a=1; b=2`).
fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
	header.split(';').find_map(|pair| {
		let (key, value) = pair.trim().split_once('=')?;

		(key.trim() == name).then(|| value.trim().trim_matches('"'))
	})
}
