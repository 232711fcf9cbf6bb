// self
use crate::_prelude::*;

/// Paths of the auth and bootstrap endpoints, relative to the API root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
	/// Credential login returning `{access, refresh}`.
	pub login: String,
	/// Refresh exchange returning `{access}`.
	pub refresh: String,
	/// Server-side logout.
	pub logout: String,
	/// Account registration.
	pub register: String,
	/// Liveness check for the current access token.
	pub verify: String,
	/// CSRF cookie bootstrap.
	pub csrf: String,
}
impl Endpoints {
	/// Returns `true` when `path` targets login, register, or refresh.
	///
	/// A 401 from these endpoints means the credentials themselves were rejected, so the
	/// dispatcher never answers it with a refresh.
	pub fn is_auth_endpoint(&self, path: &str) -> bool {
		let path = normalize(path);

		[&self.login, &self.register, &self.refresh].into_iter().any(|p| normalize(p) == path)
	}
}
impl Default for Endpoints {
	fn default() -> Self {
		Self {
			login: "/token/".into(),
			refresh: "/token/refresh/".into(),
			logout: "/logout/".into(),
			register: "/register/".into(),
			verify: "/auth/verify/".into(),
			csrf: "/csrf/".into(),
		}
	}
}

fn normalize(path: &str) -> &str {
	let path = path.split(['?', '#']).next().unwrap_or(path);

	path.trim_matches('/')
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn auth_endpoint_matching_ignores_slashes_and_queries() {
		let endpoints = Endpoints::default();

		assert!(endpoints.is_auth_endpoint("/token/"));
		assert!(endpoints.is_auth_endpoint("token/refresh"));
		assert!(endpoints.is_auth_endpoint("/register/?next=/home"));
		assert!(!endpoints.is_auth_endpoint("/news/token/"));
		assert!(!endpoints.is_auth_endpoint("/logout/"));
	}
}
