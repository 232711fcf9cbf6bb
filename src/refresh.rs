//! Single-flight access-token refresh with request queuing.
//!
//! [`RefreshCoordinator::refresh`] is called by the dispatcher after a 401. The first caller
//! becomes the leader and performs the only exchange of the cycle; callers arriving while it
//! is in flight enqueue a one-shot continuation and wait. When the exchange settles the
//! store is written first, then the queue is drained and the state returns to idle under the
//! same lock, so a request can never join a cycle that has already been resolved. A failed
//! exchange ends the session: every waiter is rejected, the store is cleared, and
//! [`SessionEvent::LoggedOut`] is emitted.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	client::{SessionEvent, SessionObserver},
	decorate::RequestDecorator,
	error::DecodeError,
	obs::{self, PipelineSpan, Stage, StageOutcome},
	store::TokenStore,
	transport::{ApiRequest, ApiTransport},
};

type Continuation = oneshot::Sender<Result<TokenSecret, String>>;

const ABANDONED: &str = "refresh was abandoned before completing";
const ENDED: &str = "session ended before the refresh could start";

#[derive(Serialize)]
struct RefreshBody<'a> {
	refresh: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
	access: Option<TokenSecret>,
	#[serde(default)]
	refresh: Option<TokenSecret>,
}

#[derive(Debug)]
enum State {
	Idle,
	Refreshing { waiters: VecDeque<Continuation> },
}

/// Serializes refresh exchanges for one session.
pub struct RefreshCoordinator<T>
where
	T: ?Sized + ApiTransport,
{
	transport: Arc<T>,
	store: Arc<TokenStore>,
	decorator: RequestDecorator,
	observer: Arc<dyn SessionObserver>,
	refresh_path: String,
	state: Mutex<State>,
	metrics: RefreshMetrics,
}
impl<T> RefreshCoordinator<T>
where
	T: ?Sized + ApiTransport,
{
	/// Creates an idle coordinator exchanging tokens at `refresh_path`.
	pub fn new(
		transport: Arc<T>,
		store: Arc<TokenStore>,
		decorator: RequestDecorator,
		observer: Arc<dyn SessionObserver>,
		refresh_path: impl Into<String>,
	) -> Self {
		Self {
			transport,
			store,
			decorator,
			observer,
			refresh_path: refresh_path.into(),
			state: Mutex::new(State::Idle),
			metrics: RefreshMetrics::default(),
		}
	}

	/// Counters describing refresh activity so far.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Returns `true` while an exchange is in flight.
	pub fn is_refreshing(&self) -> bool {
		matches!(*self.state.lock(), State::Refreshing { .. })
	}

	/// Obtains a fresh access token, joining the exchange in flight if there is one.
	///
	/// `stale` is the access token the failed request was sent with. When no exchange is in
	/// flight and the store already holds a different token, that token is returned without
	/// contacting the server. When the store was emptied after the request left, the session
	/// has already ended and the call is rejected without a new cycle.
	pub async fn refresh(&self, stale: Option<&TokenSecret>) -> Result<TokenSecret> {
		self.metrics.record_request();

		let waiter = {
			let mut state = self.state.lock();

			match &mut *state {
				State::Refreshing { waiters } => {
					let (tx, rx) = oneshot::channel();

					waiters.push_back(tx);

					Some(rx)
				},
				State::Idle => {
					if let Some(current) = self.store.access().filter(|t| stale != Some(t)) {
						return Ok(current);
					}
					if stale.is_some() && self.store.snapshot().is_empty() {
						return Err(Error::AuthRejected { reason: ENDED.into() });
					}

					*state = State::Refreshing { waiters: VecDeque::new() };

					None
				},
			}
		};

		match waiter {
			Some(rx) => {
				self.metrics.record_coalesced();

				match rx.await {
					Ok(Ok(token)) => Ok(token),
					Ok(Err(reason)) => Err(Error::AuthRejected { reason }),
					Err(_) => Err(Error::AuthRejected { reason: ABANDONED.into() }),
				}
			},
			None => self.lead().await,
		}
	}

	async fn lead(&self) -> Result<TokenSecret> {
		const STAGE: Stage = Stage::Refresh;

		let mut guard = InFlight { state: &self.state, armed: true };
		let span = PipelineSpan::new(STAGE, "refresh");

		obs::record_stage_outcome(STAGE, StageOutcome::Attempt);
		self.metrics.record_exchange();

		let outcome = span.instrument(self.exchange()).await;

		guard.armed = false;

		let result = self.settle(outcome);

		match &result {
			Ok(_) => obs::record_stage_outcome(STAGE, StageOutcome::Success),
			Err(_) => obs::record_stage_outcome(STAGE, StageOutcome::Failure),
		}

		result
	}

	async fn exchange(&self) -> Result<(TokenSecret, Option<TokenSecret>), String> {
		let refresh = self
			.store
			.refresh()
			.filter(|token| !token.is_blank())
			.ok_or_else(|| String::from("no refresh token is stored"))?;
		let request = ApiRequest::post(self.refresh_path.as_str())
			.json(&RefreshBody { refresh: refresh.expose() })
			.map_err(reason)?
			.without_auth()
			.without_refresh();
		let response =
			self.transport.send(self.decorator.decorate(request)).await.map_err(reason)?;

		if !response.is_success() {
			return Err(format!("refresh endpoint answered {}", response.status.as_u16()));
		}

		let body = response.json::<RefreshResponse>().map_err(reason)?;
		let access = body
			.access
			.filter(|token| !token.is_blank())
			.ok_or_else(|| reason(DecodeError::MissingField { field: "access" }))?;

		Ok((access, body.refresh.filter(|token| !token.is_blank())))
	}

	fn settle(
		&self,
		outcome: Result<(TokenSecret, Option<TokenSecret>), String>,
	) -> Result<TokenSecret> {
		let mut state = self.state.lock();

		match outcome {
			Ok((access, rotated)) => {
				self.store.set_access(Some(access.clone()));

				if let Some(rotated) = rotated {
					self.store.set_refresh(Some(rotated));
				}

				let waiters = take_waiters(&mut state);

				drop(state);

				for waiter in waiters {
					let _ = waiter.send(Ok(access.clone()));
				}

				self.metrics.record_success();

				Ok(access)
			},
			Err(reason) => {
				self.store.clear_all();

				let waiters = take_waiters(&mut state);

				drop(state);
				obs::refresh_rejected(&reason, waiters.len());

				for waiter in waiters {
					let _ = waiter.send(Err(reason.clone()));
				}

				self.metrics.record_failure();
				self.observer.notify(SessionEvent::LoggedOut);

				Err(Error::AuthRejected { reason })
			},
		}
	}
}
impl<T> Debug for RefreshCoordinator<T>
where
	T: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCoordinator")
			.field("refresh_path", &self.refresh_path)
			.field("refreshing", &self.is_refreshing())
			.field("metrics", &self.metrics)
			.finish()
	}
}

/// Resets the coordinator if the leader future is dropped mid-exchange.
struct InFlight<'a> {
	state: &'a Mutex<State>,
	armed: bool,
}
impl Drop for InFlight<'_> {
	fn drop(&mut self) {
		if !self.armed {
			return;
		}

		let waiters = take_waiters(&mut self.state.lock());

		for waiter in waiters {
			let _ = waiter.send(Err(ABANDONED.into()));
		}
	}
}

fn take_waiters(state: &mut State) -> VecDeque<Continuation> {
	match std::mem::replace(state, State::Idle) {
		State::Refreshing { waiters } => waiters,
		State::Idle => VecDeque::new(),
	}
}

fn reason(err: impl Display) -> String {
	err.to_string().trim_end_matches('.').to_owned()
}
