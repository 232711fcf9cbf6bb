//! Session lifecycle: CSRF bootstrap, login, registration, logout, and token verification.

// self
use crate::{
	_prelude::*,
	auth::{AccessClaims, CredentialPair, Username},
	client::{ApiClient, SessionEvent},
	obs::{self, PipelineSpan, Stage, StageOutcome},
	transport::{ApiRequest, ApiTransport},
};

#[derive(Serialize)]
struct LoginBody<'a> {
	username: &'a str,
	password: &'a str,
}

#[derive(Serialize)]
struct RegisterBody<'a> {
	user: &'a str,
	password: &'a str,
	repassword: &'a str,
}

impl<T> ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Fetches the CSRF cookie once per session.
	///
	/// Concurrent callers share a single request; the call is skipped when the cookie is
	/// already present. A failed bootstrap is retried by the next call.
	pub async fn bootstrap_csrf(&self) -> Result<()> {
		let mut done = self.csrf_bootstrapped.lock().await;

		if *done {
			return Ok(());
		}
		if self.csrf.current().is_none() {
			let request = ApiRequest::get(self.config.endpoints.csrf.as_str()).without_refresh();

			self.session_call("bootstrap_csrf", self.execute(request)).await?;
		}

		*done = true;

		Ok(())
	}

	/// Exchanges credentials for a token pair and stores it.
	///
	/// Returns the access token's claims when it is a decodable JWT.
	pub async fn login(&self, username: &Username, password: &str) -> Result<Option<AccessClaims>> {
		let request = ApiRequest::post(self.config.endpoints.login.as_str())
			.json(&LoginBody { username: username.as_ref(), password })?;
		let pair = self
			.session_call("login", async {
				let response = self.execute(request).await?;

				Ok::<_, Error>(response.json::<CredentialPair>()?)
			})
			.await?;
		let claims = pair.claims().ok();

		self.store.set_pair(pair);

		Ok(claims)
	}

	/// Creates an account; does not log in.
	pub async fn register(&self, username: &Username, password: &str) -> Result<()> {
		let request = ApiRequest::post(self.config.endpoints.register.as_str()).json(&RegisterBody {
			user: username.as_ref(),
			password,
			repassword: password,
		})?;

		self.session_call("register", self.execute(request)).await?;

		Ok(())
	}

	/// Ends the session.
	///
	/// The server call is best effort: tokens are cleared and [`SessionEvent::LoggedOut`] is
	/// emitted whatever it returns.
	pub async fn logout(&self) {
		let request = ApiRequest::post(self.config.endpoints.logout.as_str()).without_refresh();
		let _ = self.session_call("logout", self.execute(request)).await;

		self.store.clear_all();
		self.observer.notify(SessionEvent::LoggedOut);
	}

	/// Checks whether the server still accepts the session.
	///
	/// Returns `false` when the server rejects the token (after the usual refresh attempt);
	/// other failures propagate.
	pub async fn verify(&self) -> Result<bool> {
		let request = ApiRequest::get(self.config.endpoints.verify.as_str());

		match self.session_call("verify", self.execute(request)).await {
			Ok(_) => Ok(true),
			Err(Error::AuthExpired { .. } | Error::AuthRejected { .. }) => Ok(false),
			Err(err) => Err(err),
		}
	}

	async fn session_call<F, R>(&self, op: &'static str, fut: F) -> Result<R>
	where
		F: Future<Output = Result<R>>,
	{
		const STAGE: Stage = Stage::Session;

		let span = PipelineSpan::new(STAGE, op);

		obs::record_stage_outcome(STAGE, StageOutcome::Attempt);

		let result = span.instrument(fut).await;

		match &result {
			Ok(_) => obs::record_stage_outcome(STAGE, StageOutcome::Success),
			Err(_) => obs::record_stage_outcome(STAGE, StageOutcome::Failure),
		}

		result
	}
}
