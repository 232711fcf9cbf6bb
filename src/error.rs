//! Pipeline-level error types shared across the dispatcher, refresh coordinator, and poller.

// self
use crate::_prelude::*;

/// Pipeline-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical pipeline error exposed by public APIs.
///
/// Transport and auth failures are classified once by the dispatcher and surfaced with their
/// bucket attached; see [`Error::kind`] and [`Error::notice`].
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// No response was received (DNS, TCP, TLS, or a client-side deadline).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Response body could not be decoded.
	#[error(transparent)]
	Decode(#[from] DecodeError),
	/// Caller-supplied identifier failed validation.
	#[error(transparent)]
	Identifier(#[from] crate::auth::IdentifierError),

	/// Access token was rejected and no refresh was attempted for this request.
	#[error("Authentication expired: {}.", sentence(.message))]
	AuthExpired {
		/// Server- or client-supplied message.
		message: String,
	},
	/// Refresh exchange failed; the session is over.
	#[error("Session refresh was rejected: {}.", sentence(.reason))]
	AuthRejected {
		/// Reason captured from the failed exchange.
		reason: String,
	},
	/// Request payload failed server-side validation (HTTP 400).
	#[error("Validation failed: {}.", sentence(.message))]
	Validation {
		/// Summary extracted from the response body.
		message: String,
		/// Untouched response body so forms can render per-field errors.
		detail: serde_json::Value,
	},
	/// Caller lacks permission (HTTP 403).
	#[error("Forbidden: {}.", sentence(.message))]
	Forbidden {
		/// Summary extracted from the response body.
		message: String,
	},
	/// Resource does not exist (HTTP 404).
	#[error("Not found: {}.", sentence(.message))]
	NotFound {
		/// Summary extracted from the response body.
		message: String,
	},
	/// Server throttled the request (HTTP 429).
	#[error("Rate limited: {}.", sentence(.message))]
	RateLimited {
		/// Summary extracted from the response body.
		message: String,
		/// Retry-After hint, when supplied.
		retry_after: Option<Duration>,
	},
	/// Server failure (HTTP 5xx).
	#[error("Server error ({status}): {}.", sentence(.message))]
	ServerError {
		/// HTTP status code.
		status: u16,
		/// Summary extracted from the response body.
		message: String,
	},
	/// Any other non-success status.
	#[error("Unexpected response ({status}): {}.", sentence(.message))]
	Unexpected {
		/// HTTP status code.
		status: u16,
		/// Summary extracted from the response body.
		message: String,
	},
	/// Poller observed a terminal failure status.
	#[error("Job `{job}` failed: {}.", sentence(.reason))]
	JobFailed {
		/// Job identifier.
		job: String,
		/// Failure reason reported by the server.
		reason: String,
	},
	/// Poller gave up without observing a terminal status.
	#[error("Job `{job}` did not finish after {attempts} status checks.")]
	PollBudgetExhausted {
		/// Job identifier.
		job: String,
		/// Number of status queries issued.
		attempts: u32,
	},
	/// Poller was cancelled by its owner.
	#[error("Polling for job `{job}` was cancelled.")]
	PollCancelled {
		/// Job identifier.
		job: String,
	},
}
impl Error {
	/// Returns the message bucket for this error.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Config(_) | Self::Identifier(_) => ErrorKind::Config,
			Self::Transport(TransportError::Timeout { .. }) => ErrorKind::Timeout,
			Self::Transport(_) => ErrorKind::Network,
			Self::Decode(_) | Self::Unexpected { .. } => ErrorKind::Unexpected,
			Self::AuthExpired { .. } => ErrorKind::AuthExpired,
			Self::AuthRejected { .. } => ErrorKind::AuthRejected,
			Self::Validation { .. } => ErrorKind::Validation,
			Self::Forbidden { .. } => ErrorKind::Forbidden,
			Self::NotFound { .. } => ErrorKind::NotFound,
			Self::RateLimited { .. } => ErrorKind::RateLimited,
			Self::ServerError { .. } => ErrorKind::ServerError,
			Self::JobFailed { .. } => ErrorKind::JobFailed,
			Self::PollBudgetExhausted { .. } => ErrorKind::PollBudgetExhausted,
			Self::PollCancelled { .. } => ErrorKind::PollCancelled,
		}
	}

	/// Returns `true` when a later attempt may succeed without caller intervention.
	pub fn is_transient(&self) -> bool {
		matches!(
			self.kind(),
			ErrorKind::Network | ErrorKind::Timeout | ErrorKind::ServerError | ErrorKind::RateLimited
		)
	}

	/// Builds the user-facing notification for this error.
	pub fn notice(&self) -> Notice {
		let kind = self.kind();

		Notice { kind, severity: kind.severity(), message: kind.default_message() }
	}
}

/// Message buckets used to classify failures for display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	/// Local configuration or input problem.
	Config,
	/// 401 outside of a refresh cycle.
	AuthExpired,
	/// Refresh exchange failed.
	AuthRejected,
	/// HTTP 400.
	Validation,
	/// HTTP 403.
	Forbidden,
	/// HTTP 404.
	NotFound,
	/// HTTP 429.
	RateLimited,
	/// HTTP 5xx.
	ServerError,
	/// Client-side deadline exceeded.
	Timeout,
	/// Connection failure without a response.
	Network,
	/// Other statuses or undecodable bodies.
	Unexpected,
	/// Job reported failure.
	JobFailed,
	/// Job never reached a terminal status.
	PollBudgetExhausted,
	/// Polling was cancelled.
	PollCancelled,
}
impl ErrorKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Config => "config",
			Self::AuthExpired => "auth_expired",
			Self::AuthRejected => "auth_rejected",
			Self::Validation => "validation",
			Self::Forbidden => "forbidden",
			Self::NotFound => "not_found",
			Self::RateLimited => "rate_limited",
			Self::ServerError => "server_error",
			Self::Timeout => "timeout",
			Self::Network => "network",
			Self::Unexpected => "unexpected",
			Self::JobFailed => "job_failed",
			Self::PollBudgetExhausted => "poll_budget_exhausted",
			Self::PollCancelled => "poll_cancelled",
		}
	}

	/// Human-readable message shown when the server supplied nothing better.
	pub const fn default_message(self) -> &'static str {
		match self {
			Self::Config => "The client is misconfigured.",
			Self::AuthExpired => "Your session has expired. Please sign in again.",
			Self::AuthRejected => "Your session could not be renewed. Please sign in again.",
			Self::Validation => "Check that every field is filled in correctly.",
			Self::Forbidden => "You do not have permission to perform this action.",
			Self::NotFound => "The requested resource does not exist.",
			Self::RateLimited => "Too many requests. Try again later.",
			Self::ServerError => "Server error. Try again later.",
			Self::Timeout => "The request took too long.",
			Self::Network => "Connection error. Check your internet connection.",
			Self::Unexpected => "An unexpected error occurred.",
			Self::JobFailed => "The analysis failed.",
			Self::PollBudgetExhausted => "The analysis is taking longer than expected.",
			Self::PollCancelled => "The analysis was cancelled.",
		}
	}

	/// Notification severity for the bucket; server-side trouble is a warning.
	pub const fn severity(self) -> Severity {
		match self {
			Self::ServerError | Self::PollBudgetExhausted => Severity::Warning,
			_ => Severity::Error,
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Notification severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
	/// Recoverable condition.
	Warning,
	/// Failure.
	Error,
}

/// Transient notification describing a classified error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notice {
	/// Message bucket.
	pub kind: ErrorKind,
	/// Display severity.
	pub severity: Severity,
	/// Human-readable message keyed by bucket.
	pub message: &'static str,
}

/// Configuration and validation failures raised while assembling the pipeline.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base URL uses a scheme other than http or https.
	#[error("Base URL must use http or https, got `{scheme}`.")]
	UnsupportedScheme {
		/// Offending scheme.
		scheme: String,
	},
	/// Base URL cannot have paths joined onto it.
	#[error("Base URL `{url}` cannot be used as a base.")]
	CannotBeABase {
		/// Offending URL.
		url: String,
	},
	/// Endpoint path could not be joined onto the base URL.
	#[error("Endpoint `{path}` is invalid.")]
	InvalidEndpoint {
		/// Path that failed to join.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Configured header name is not a valid HTTP header name.
	#[error("`{name}` is not a valid header name.")]
	InvalidHeaderName {
		/// Offending header name.
		name: String,
	},
	/// Configured cookie name is empty or contains separators.
	#[error("`{name}` is not a valid cookie name.")]
	InvalidCookieName {
		/// Offending cookie name.
		name: String,
	},
	/// Request timeout must be positive.
	#[error("Request timeout must be positive.")]
	NonPositiveTimeout,
	/// Poll settings must use a positive interval and at least one attempt.
	#[error("Poll interval must be positive and max_attempts at least 1.")]
	InvalidPollConfig,
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	BodySerialize(#[source] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures where no response was received.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a connection failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Client-side deadline elapsed before a response arrived.
	#[error("Request to the API timed out.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timeout(e) } else { Self::network(e) }
	}
}

/// Response bodies that could not be decoded into the expected shape.
#[derive(Debug, ThisError)]
pub enum DecodeError {
	/// API responded with malformed or mismatched JSON.
	#[error("API returned malformed JSON at `{path}`.")]
	Json {
		/// JSON path where decoding stopped.
		path: String,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the response.
		status: u16,
	},
	/// A required field was absent from an otherwise valid body.
	#[error("API response is missing `{field}`.")]
	MissingField {
		/// Field name.
		field: &'static str,
	},
}
impl DecodeError {
	/// Wraps a path-aware JSON failure.
	pub fn json(source: serde_path_to_error::Error<serde_json::Error>, status: u16) -> Self {
		Self::Json { path: source.path().to_string(), source, status }
	}
}

/// Drops trailing periods so server sentences read cleanly inside a formatted message.
fn sentence(text: &str) -> &str {
	text.trim_end_matches('.')
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn kinds_map_to_notices() {
		let err = Error::ServerError { status: 503, message: "down".into() };
		let notice = err.notice();

		assert_eq!(notice.kind, ErrorKind::ServerError);
		assert_eq!(notice.severity, Severity::Warning);
		assert_eq!(notice.message, "Server error. Try again later.");

		let err = Error::Forbidden { message: "nope".into() };

		assert_eq!(err.notice().severity, Severity::Error);
		assert!(!err.is_transient());
	}

	#[test]
	fn display_does_not_double_trailing_periods() {
		let expired = Error::AuthExpired {
			message: ErrorKind::AuthExpired.default_message().into(),
		};
		let rejected = Error::AuthRejected { reason: "no refresh token is stored".into() };
		let server = Error::ServerError { status: 502, message: "Bad gateway.".into() };

		assert_eq!(
			expired.to_string(),
			"Authentication expired: Your session has expired. Please sign in again."
		);
		assert_eq!(
			rejected.to_string(),
			"Session refresh was rejected: no refresh token is stored."
		);
		assert_eq!(server.to_string(), "Server error (502): Bad gateway.");
	}

	#[test]
	fn timeouts_are_distinguished_from_network_failures() {
		let timeout: Error =
			TransportError::timeout(std::io::Error::from(std::io::ErrorKind::TimedOut)).into();
		let network: Error =
			TransportError::network(std::io::Error::from(std::io::ErrorKind::ConnectionRefused))
				.into();

		assert_eq!(timeout.kind(), ErrorKind::Timeout);
		assert_eq!(network.kind(), ErrorKind::Network);
		assert!(timeout.is_transient());
		assert!(network.is_transient());
	}

	#[test]
	fn decode_errors_keep_json_path() {
		#[derive(Debug, Deserialize)]
		#[allow(dead_code)]
		struct Body {
			access: String,
		}

		let de = &mut serde_json::Deserializer::from_str("{\"access\": 7}");
		let source = serde_path_to_error::deserialize::<_, Body>(de)
			.expect_err("Numeric access token should fail to decode.");
		let err = DecodeError::json(source, 200);

		assert!(matches!(&err, DecodeError::Json { path, status: 200, .. } if path == "access"));
	}
}
