//! Response dispatching: success pass-through, the single 401 refresh-and-replay, and
//! classification of everything else.

// crates.io
use http::StatusCode;
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	client::{ApiClient, SessionEvent, classify},
	error::ErrorKind,
	obs::{self, PipelineSpan, Stage, StageOutcome},
	transport::{ApiRequest, ApiResponse, ApiTransport},
};

impl<T> ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Decorates and sends `request`, returning the 2xx response.
	///
	/// A 401 on a non-auth endpoint is answered once with a refresh followed by a replay using
	/// the new token. Requests that arrive while a refresh is in flight wait for it instead of
	/// starting another. Every other failure is classified into an [`Error`] bucket.
	pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
		const STAGE: Stage = Stage::Dispatch;

		let span = PipelineSpan::new(STAGE, "execute");
		let method = request.method.clone();
		let path = request.path.clone();

		obs::record_stage_outcome(STAGE, StageOutcome::Attempt);

		let result = span.instrument(self.dispatch(request)).await;

		match &result {
			Ok(_) => obs::record_stage_outcome(STAGE, StageOutcome::Success),
			Err(err) => {
				obs::request_failed(&method, &path, err);
				obs::record_stage_outcome(STAGE, StageOutcome::Failure);
			},
		}

		result
	}

	/// Sends a `GET` and decodes the JSON body.
	pub async fn get_json<R>(&self, path: &str) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.send_json(ApiRequest::get(path)).await
	}

	/// Sends a `POST` with a JSON body and decodes the JSON response.
	pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.send_json(ApiRequest::post(path).json(body)?).await
	}

	/// Executes `request` and decodes the JSON body.
	pub async fn send_json<R>(&self, request: ApiRequest) -> Result<R>
	where
		R: DeserializeOwned,
	{
		let response = self.execute(request).await?;

		Ok(response.json()?)
	}

	async fn dispatch(&self, mut request: ApiRequest) -> Result<ApiResponse> {
		let mut access = self.store.access();

		loop {
			let decorated = self.decorator.decorate_with(request.clone(), access.as_ref());
			let response = self.transport.send(decorated).await?;

			if response.is_success() {
				self.forward_warning(&response);

				return Ok(response);
			}
			if response.status != StatusCode::UNAUTHORIZED {
				return Err(classify::classify(&response));
			}

			let auth_endpoint = self.config.endpoints.is_auth_endpoint(&request.path);

			if auth_endpoint || request.is_retried() || request.skip_refresh {
				if !auth_endpoint {
					self.observer.notify(SessionEvent::SessionInvalid);
				}

				return Err(Error::AuthExpired {
					message: classify::message_or_default(
						response.json_value().as_ref(),
						ErrorKind::AuthExpired,
					),
				});
			}

			request.mark_retried();
			access = Some(self.coordinator.refresh(access.as_ref()).await?);
		}
	}

	fn forward_warning(&self, response: &ApiResponse) {
		let warning = response.json_value().and_then(|body| match body.get("warning") {
			Some(serde_json::Value::String(text)) if !text.trim().is_empty() => Some(text.clone()),
			_ => None,
		});

		if let Some(warning) = warning {
			self.observer.notify(SessionEvent::Warning(warning));
		}
	}
}
