//! Maps non-success responses onto [`Error`] buckets with a readable message.

// crates.io
use serde_json::Value;
// self
use crate::{_prelude::*, error::ErrorKind, transport::ApiResponse};

/// Keys checked, in order, for a top-level message.
const MESSAGE_KEYS: [&str; 4] = ["detail", "message", "error", "non_field_errors"];

/// Classifies a non-2xx response.
pub fn classify(response: &ApiResponse) -> Error {
	let body = response.json_value();
	let status = response.status.as_u16();
	let message = |kind: ErrorKind| message_or_default(body.as_ref(), kind);

	match status {
		400 => Error::Validation {
			message: message(ErrorKind::Validation),
			detail: body.clone().unwrap_or(Value::Null),
		},
		401 => Error::AuthExpired { message: message(ErrorKind::AuthExpired) },
		403 => Error::Forbidden { message: message(ErrorKind::Forbidden) },
		404 => Error::NotFound { message: message(ErrorKind::NotFound) },
		429 => Error::RateLimited {
			message: message(ErrorKind::RateLimited),
			retry_after: response.retry_after(),
		},
		500..=599 => Error::ServerError { status, message: message(ErrorKind::ServerError) },
		_ => Error::Unexpected { status, message: message(ErrorKind::Unexpected) },
	}
}

/// Extracted message, or the bucket's default when the body has none.
pub fn message_or_default(body: Option<&Value>, kind: ErrorKind) -> String {
	body.and_then(extract_message).unwrap_or_else(|| kind.default_message().to_owned())
}

/// Pulls a human-readable message out of an error body.
///
/// Looks at `detail`, `message`, `error`, then `non_field_errors`, and finally renders
/// per-field error lists as `field: a, b` joined with `; `.
pub fn extract_message(body: &Value) -> Option<String> {
	match body {
		Value::Object(map) => {
			let top = MESSAGE_KEYS.iter().find_map(|key| map.get(*key).and_then(flatten));

			if top.is_some() {
				return top;
			}

			let fields = map
				.iter()
				.filter_map(|(field, value)| flatten(value).map(|text| format!("{field}: {text}")))
				.collect::<Vec<_>>();

			(!fields.is_empty()).then(|| fields.join("; "))
		},
		other => flatten(other),
	}
}

/// Renders a string or a list of strings; anything else is ignored.
fn flatten(value: &Value) -> Option<String> {
	match value {
		Value::String(text) => Some(text.trim().to_owned()).filter(|text| !text.is_empty()),
		Value::Array(items) => {
			let parts = items.iter().filter_map(flatten).collect::<Vec<_>>();

			(!parts.is_empty()).then(|| parts.join(", "))
		},
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use http::{HeaderValue, StatusCode, header::RETRY_AFTER};
	use serde_json::json;
	// self
	use super::*;

	fn respond(status: u16, body: Value) -> ApiResponse {
		ApiResponse::json_body(StatusCode::from_u16(status).expect("Fixture status is valid."), &body)
	}

	#[test]
	fn message_precedence_prefers_detail() {
		assert_eq!(
			extract_message(&json!({ "message": "m", "detail": "d" })).as_deref(),
			Some("d")
		);
		assert_eq!(extract_message(&json!({ "error": "e" })).as_deref(), Some("e"));
		assert_eq!(
			extract_message(&json!({ "non_field_errors": ["a", "b"] })).as_deref(),
			Some("a, b")
		);
		assert_eq!(
			extract_message(&json!({ "password": ["too short"], "user": ["taken", "invalid"] }))
				.as_deref(),
			Some("password: too short; user: taken, invalid")
		);
		assert_eq!(extract_message(&json!({ "count": 3 })), None);
	}

	#[test]
	fn statuses_map_to_buckets() {
		let detail = json!({ "user": ["This field is required."] });
		let err = classify(&respond(400, detail.clone()));

		assert!(matches!(
			err,
			Error::Validation { ref message, detail: ref kept }
				if message == "user: This field is required." && *kept == detail
		));
		assert!(matches!(classify(&respond(403, json!({}))), Error::Forbidden { .. }));
		assert!(matches!(classify(&respond(404, json!({}))), Error::NotFound { .. }));
		assert!(matches!(
			classify(&respond(502, json!(null))),
			Error::ServerError { status: 502, ref message } if message == "Server error. Try again later."
		));
		assert!(matches!(classify(&respond(409, json!({}))), Error::Unexpected { status: 409, .. }));
	}

	#[test]
	fn rate_limits_carry_retry_after() {
		let mut response = respond(429, json!({ "detail": "Slow down." }));

		response.headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));

		assert!(matches!(
			classify(&response),
			Error::RateLimited { ref message, retry_after: Some(after) }
				if message == "Slow down." && after == Duration::seconds(7)
		));
	}

	#[test]
	fn non_json_bodies_fall_back_to_defaults() {
		let response = ApiResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>");

		assert!(matches!(
			classify(&response),
			Error::ServerError { status: 500, ref message } if message == ErrorKind::ServerError.default_message()
		));
	}
}
