//! Transport primitives for API calls.
//!
//! The pipeline depends on HTTP only through [`ApiTransport`]: it hands over a fully
//! decorated [`ApiRequest`] and receives an [`ApiResponse`] for every status code. Only
//! failures where no response arrived (connection errors, deadlines) surface as errors, so
//! status classification stays in one place. [`ReqwestTransport`] is the default
//! implementation and shares its cookie jar with [`crate::csrf::CookieJarCsrf`].

// crates.io
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
#[cfg(feature = "reqwest")] use reqwest::cookie::Jar;
use serde::de::DeserializeOwned;
use time::format_description::well_known::Rfc2822;
// self
use crate::{
	_prelude::*,
	config::ClientConfig,
	error::{ConfigError, DecodeError},
};

/// Boxed future returned by [`ApiTransport::send`].
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<ApiResponse>> + 'a + Send>>;

/// Abstraction over HTTP stacks able to execute API requests.
///
/// Implementations resolve [`ApiRequest::path`] against their own base URL, send the request
/// verbatim (headers are already decorated), and return every HTTP response as `Ok`,
/// regardless of status. Errors are reserved for transport failures mapped into
/// [`crate::error::TransportError`].
pub trait ApiTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` once.
	fn send(&self, request: ApiRequest) -> TransportFuture<'_>;
}

/// Outgoing request descriptor.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP verb.
	pub method: Method,
	/// Path relative to the API root, optionally with a query string.
	pub path: String,
	/// Request headers; the decorator owns `Authorization` and the CSRF header.
	pub headers: HeaderMap,
	/// Serialized JSON body.
	pub body: Option<Vec<u8>>,
	/// Never attach a bearer token (used by the refresh exchange).
	pub skip_auth: bool,
	/// Never answer a 401 with a refresh.
	pub skip_refresh: bool,
	retried: bool,
}
impl ApiRequest {
	/// Creates a request for `method` + `path` with no body.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			headers: HeaderMap::new(),
			body: None,
			skip_auth: false,
			skip_refresh: false,
			retried: false,
		}
	}

	/// Shorthand for a `GET`.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// Shorthand for a `POST`.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// Shorthand for a `PUT`.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::PUT, path)
	}

	/// Shorthand for a `PATCH`.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::PATCH, path)
	}

	/// Shorthand for a `DELETE`.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Serializes `body` as JSON and sets `Content-Type: application/json`.
	pub fn json<B>(mut self, body: &B) -> Result<Self, ConfigError>
	where
		B: ?Sized + Serialize,
	{
		let bytes = serde_json::to_vec(body).map_err(ConfigError::BodySerialize)?;

		self.body = Some(bytes);
		self.headers
			.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

		Ok(self)
	}

	/// Adds or replaces a header.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Marks the request as never carrying a bearer token.
	pub fn without_auth(mut self) -> Self {
		self.skip_auth = true;

		self
	}

	/// Marks the request as never triggering a refresh on 401.
	pub fn without_refresh(mut self) -> Self {
		self.skip_refresh = true;

		self
	}

	/// Returns `true` once the dispatcher has replayed this request after a refresh.
	pub fn is_retried(&self) -> bool {
		self.retried
	}

	pub(crate) fn mark_retried(&mut self) {
		self.retried = true;
	}
}

/// Response captured by a transport.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// HTTP status.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Creates a response from its parts.
	pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: HeaderMap::new(), body: body.into() }
	}

	/// Creates a response with a JSON body.
	pub fn json_body(status: StatusCode, body: &serde_json::Value) -> Self {
		let mut response = Self::new(status, body.to_string());

		response
			.headers
			.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

		response
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Decodes the body into `T`, reporting the JSON path on failure.
	///
	/// An empty body decodes as `null` so `()` and `Option<_>` targets accept 204 responses.
	pub fn json<T>(&self) -> Result<T, DecodeError>
	where
		T: DeserializeOwned,
	{
		let bytes: &[u8] = if self.body.is_empty() { b"null" } else { &self.body };
		let de = &mut serde_json::Deserializer::from_slice(bytes);

		serde_path_to_error::deserialize(de).map_err(|e| DecodeError::json(e, self.status.as_u16()))
	}

	/// Parses the body as loose JSON; `None` for empty or non-JSON bodies.
	pub fn json_value(&self) -> Option<serde_json::Value> {
		if self.body.is_empty() {
			return None;
		}

		serde_json::from_slice(&self.body).ok()
	}

	/// Retry-After hint expressed as a relative duration.
	pub fn retry_after(&self) -> Option<Duration> {
		parse_retry_after(&self.headers)
	}
}

/// Reqwest-backed [`ApiTransport`] with a shared cookie jar.
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct ReqwestTransport {
	client: ReqwestClient,
	jar: Arc<Jar>,
	config: ClientConfig,
}
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds a transport honoring the configured deadline, with a fresh cookie jar.
	pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
		let jar = Arc::new(Jar::default());
		let client = ReqwestClient::builder()
			.cookie_provider(jar.clone())
			.timeout(config.timeout.unsigned_abs())
			.build()?;

		Ok(Self { client, jar, config: config.clone() })
	}

	/// Wraps an existing reqwest client; `jar` must be the cookie provider it was built with.
	pub fn with_client(client: ReqwestClient, jar: Arc<Jar>, config: &ClientConfig) -> Self {
		Self { client, jar, config: config.clone() }
	}

	/// Cookie jar shared with the CSRF source.
	pub fn cookie_jar(&self) -> Arc<Jar> {
		self.jar.clone()
	}
}
#[cfg(feature = "reqwest")]
impl Debug for ReqwestTransport {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ReqwestTransport").field("base_url", &self.config.base_url.as_str()).finish()
	}
}
#[cfg(feature = "reqwest")]
impl ApiTransport for ReqwestTransport {
	fn send(&self, request: ApiRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let url = self.config.url_for(&request.path)?;
			let mut builder = self.client.request(request.method, url).headers(request.headers);

			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response =
				builder.send().await.map_err(crate::error::TransportError::from)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body =
				response.bytes().await.map_err(crate::error::TransportError::from)?.to_vec();

			Ok(ApiResponse { status, headers, body })
		})
	}
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(header::RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn json_requests_set_content_type() {
		let request = ApiRequest::post("/register/")
			.json(&serde_json::json!({ "user": "ana", "password": "pw" }))
			.expect("JSON body should serialize.");

		assert_eq!(
			request.headers.get(header::CONTENT_TYPE).map(HeaderValue::as_bytes),
			Some(&b"application/json"[..])
		);
		assert!(request.body.is_some());
		assert!(!request.is_retried());
	}

	#[test]
	fn retry_after_accepts_seconds() {
		let mut response = ApiResponse::new(StatusCode::TOO_MANY_REQUESTS, "");

		response.headers.insert(header::RETRY_AFTER, HeaderValue::from_static("30"));

		assert_eq!(response.retry_after(), Some(Duration::seconds(30)));

		response.headers.insert(header::RETRY_AFTER, HeaderValue::from_static("soon"));

		assert_eq!(response.retry_after(), None);
	}

	#[test]
	fn json_decoding_reports_path() {
		#[derive(Debug, Deserialize)]
		#[allow(dead_code)]
		struct Refreshed {
			access: String,
		}

		let response = ApiResponse::json_body(StatusCode::OK, &serde_json::json!({ "access": 1 }));
		let err = response.json::<Refreshed>().expect_err("Numeric token should not decode.");

		assert!(matches!(err, DecodeError::Json { ref path, status: 200, .. } if path == "access"));
		assert!(ApiResponse::new(StatusCode::OK, "").json_value().is_none());
	}
}
