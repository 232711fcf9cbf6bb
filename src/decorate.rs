//! Attaches the bearer token and CSRF header to outgoing requests.

// crates.io
use http::{HeaderName, HeaderValue, header::AUTHORIZATION};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	csrf::{self, CsrfSource},
	obs,
	store::TokenStore,
	transport::ApiRequest,
};

/// Stateless request decorator reading the session's token store and CSRF source.
///
/// Decoration never fails: values that cannot be encoded as header values are skipped and
/// reported through [`obs::header_skipped`].
#[derive(Clone)]
pub struct RequestDecorator {
	store: Arc<TokenStore>,
	csrf: Arc<dyn CsrfSource>,
	csrf_header: HeaderName,
}
impl RequestDecorator {
	/// Creates a decorator writing the CSRF token into `csrf_header`.
	pub fn new(store: Arc<TokenStore>, csrf: Arc<dyn CsrfSource>, csrf_header: HeaderName) -> Self {
		Self { store, csrf, csrf_header }
	}

	/// Decorates `request` with the store's current access token.
	pub fn decorate(&self, request: ApiRequest) -> ApiRequest {
		let access = self.store.access();

		self.decorate_with(request, access.as_ref())
	}

	/// Decorates `request` with an explicit access token.
	///
	/// `Authorization` is replaced (never appended) when `access` is set and the request does
	/// not opt out of auth; otherwise any stale value is removed.
	pub fn decorate_with(&self, mut request: ApiRequest, access: Option<&TokenSecret>) -> ApiRequest {
		let bearer = access
			.filter(|_| !request.skip_auth)
			.filter(|token| !token.is_blank())
			.and_then(|token| {
				let value = HeaderValue::try_from(format!("Bearer {}", token.expose()));

				match value {
					Ok(mut value) => {
						value.set_sensitive(true);

						Some(value)
					},
					Err(_) => {
						obs::header_skipped("authorization");

						None
					},
				}
			});

		match bearer {
			Some(value) => {
				request.headers.insert(AUTHORIZATION, value);
			},
			None => {
				request.headers.remove(AUTHORIZATION);
			},
		}

		let csrf = csrf::csrf_required(&request.method).then(|| self.csrf.current()).flatten();

		if let Some(token) = csrf {
			match HeaderValue::from_str(token.expose()) {
				Ok(value) => {
					request.headers.insert(self.csrf_header.clone(), value);
				},
				Err(_) => obs::header_skipped("csrf"),
			}
		}

		request
	}
}
impl Debug for RequestDecorator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestDecorator").field("csrf_header", &self.csrf_header).finish()
	}
}
