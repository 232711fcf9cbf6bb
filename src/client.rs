//! Session-owned API client tying the pipeline together.
//!
//! [`ApiClient`] is constructed once per session and shared by cloning (every field is an
//! `Arc`). It owns the token store, the request decorator, and the refresh coordinator, and
//! exposes the dispatcher ([`ApiClient::execute`] plus JSON helpers), the session operations,
//! and the analysis job integration.

pub mod analysis;
pub mod classify;
pub mod dispatch;
pub mod session;

pub use analysis::*;

// self
use crate::{
	_prelude::*,
	config::ClientConfig,
	csrf::{CsrfSource, StaticCsrf},
	decorate::RequestDecorator,
	error::ConfigError,
	refresh::{RefreshCoordinator, RefreshMetrics},
	store::TokenStore,
	transport::ApiTransport,
};
#[cfg(feature = "reqwest")] use crate::{csrf::CookieJarCsrf, transport::ReqwestTransport};

/// Out-of-band notifications raised while dispatching requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
	/// A successful response carried a `warning` message worth surfacing.
	Warning(String),
	/// A request was rejected with 401 and no refresh could be attempted for it.
	SessionInvalid,
	/// The session ended: tokens were cleared by logout or a failed refresh.
	LoggedOut,
}

/// Receiver of [`SessionEvent`]s, typically the UI or session owner.
pub trait SessionObserver
where
	Self: Send + Sync,
{
	/// Handles one event; must not block.
	fn notify(&self, event: SessionEvent);
}

/// Observer that discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;
impl SessionObserver for NoopObserver {
	fn notify(&self, _event: SessionEvent) {}
}

/// Authenticated NewsTrader API client.
pub struct ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	config: Arc<ClientConfig>,
	transport: Arc<T>,
	store: Arc<TokenStore>,
	csrf: Arc<dyn CsrfSource>,
	decorator: RequestDecorator,
	coordinator: Arc<RefreshCoordinator<T>>,
	observer: Arc<dyn SessionObserver>,
	csrf_bootstrapped: Arc<AsyncMutex<bool>>,
}
impl<T> ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Starts a builder over `config` and `transport`.
	pub fn builder(config: ClientConfig, transport: impl Into<Arc<T>>) -> ApiClientBuilder<T> {
		ApiClientBuilder {
			config,
			transport: transport.into(),
			store: None,
			csrf: None,
			observer: None,
		}
	}

	/// Validated configuration.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Token store owned by this session.
	pub fn store(&self) -> &Arc<TokenStore> {
		&self.store
	}

	/// Transport used for every request.
	pub fn transport(&self) -> &Arc<T> {
		&self.transport
	}

	/// Refresh counters.
	pub fn refresh_metrics(&self) -> &RefreshMetrics {
		self.coordinator.metrics()
	}

	/// Returns `true` while a refresh exchange is in flight.
	pub fn is_refreshing(&self) -> bool {
		self.coordinator.is_refreshing()
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestTransport> {
	/// Builds a reqwest-backed client whose CSRF source reads the transport's cookie jar.
	pub fn connect(config: ClientConfig) -> Result<Self, ConfigError> {
		let transport = ReqwestTransport::new(&config)?;
		let csrf = CookieJarCsrf::new(transport.cookie_jar(), &config);

		Self::builder(config, transport).csrf(Arc::new(csrf)).build()
	}
}
impl<T> Clone for ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	fn clone(&self) -> Self {
		Self {
			config: self.config.clone(),
			transport: self.transport.clone(),
			store: self.store.clone(),
			csrf: self.csrf.clone(),
			decorator: self.decorator.clone(),
			coordinator: self.coordinator.clone(),
			observer: self.observer.clone(),
			csrf_bootstrapped: self.csrf_bootstrapped.clone(),
		}
	}
}
impl<T> Debug for ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("store", &self.store)
			.field("coordinator", &self.coordinator)
			.finish()
	}
}

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder<T>
where
	T: ?Sized + ApiTransport,
{
	config: ClientConfig,
	transport: Arc<T>,
	store: Option<Arc<TokenStore>>,
	csrf: Option<Arc<dyn CsrfSource>>,
	observer: Option<Arc<dyn SessionObserver>>,
}
impl<T> ApiClientBuilder<T>
where
	T: ?Sized + ApiTransport,
{
	/// Uses `store` instead of a fresh in-memory store.
	pub fn store(mut self, store: Arc<TokenStore>) -> Self {
		self.store = Some(store);

		self
	}

	/// Uses `csrf` as the CSRF token source; defaults to an empty [`StaticCsrf`].
	pub fn csrf(mut self, csrf: Arc<dyn CsrfSource>) -> Self {
		self.csrf = Some(csrf);

		self
	}

	/// Sends session events to `observer`; defaults to [`NoopObserver`].
	pub fn observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
		self.observer = Some(observer);

		self
	}

	/// Validates the configuration and assembles the client.
	pub fn build(self) -> Result<ApiClient<T>, ConfigError> {
		let Self { config, transport, store, csrf, observer } = self;

		config.validate()?;

		let csrf_header = config.csrf_header()?;
		let store = store.unwrap_or_default();
		let csrf = csrf.unwrap_or_else(|| Arc::new(StaticCsrf::default()));
		let observer = observer.unwrap_or_else(|| Arc::new(NoopObserver));
		let decorator = RequestDecorator::new(store.clone(), csrf.clone(), csrf_header);
		let coordinator = Arc::new(RefreshCoordinator::new(
			transport.clone(),
			store.clone(),
			decorator.clone(),
			observer.clone(),
			config.endpoints.refresh.clone(),
		));

		Ok(ApiClient {
			config: Arc::new(config),
			transport,
			store,
			csrf,
			decorator,
			coordinator,
			observer,
			csrf_bootstrapped: Default::default(),
		})
	}
}
impl<T> Debug for ApiClientBuilder<T>
where
	T: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClientBuilder").field("config", &self.config).finish()
	}
}
