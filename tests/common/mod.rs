#![allow(dead_code)]

// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};
// crates.io
use http::{StatusCode, header::AUTHORIZATION};
use parking_lot::Mutex;
use serde_json::Value;
// self
use news_trader_client::{
	client::{ApiClient, SessionEvent, SessionObserver},
	config::ClientConfig,
	csrf::StaticCsrf,
	error::Result,
	store::TokenStore,
	transport::{ApiRequest, ApiResponse, ApiTransport, TransportFuture},
	url::Url,
};

pub const REFRESH_PATH: &str = "/token/refresh/";

type Handler = dyn Fn(&ApiRequest) -> Result<ApiResponse> + Send + Sync;

/// Transport answering from a closure and recording every request it sees.
pub struct ScriptedTransport {
	handler: Box<Handler>,
	refresh_delay: Duration,
	delays: Vec<(String, Duration)>,
	sent: Mutex<Vec<ApiRequest>>,
}
impl ScriptedTransport {
	pub fn new<F>(handler: F) -> Self
	where
		F: 'static + Fn(&ApiRequest) -> Result<ApiResponse> + Send + Sync,
	{
		Self {
			handler: Box::new(handler),
			refresh_delay: Duration::from_millis(50),
			delays: Vec::new(),
			sent: Mutex::new(Vec::new()),
		}
	}

	/// Holds responses for `path` open for `delay`.
	pub fn with_delay(mut self, path: &str, delay: Duration) -> Self {
		self.delays.push((path.to_owned(), delay));

		self
	}

	pub fn sent(&self) -> Vec<ApiRequest> {
		self.sent.lock().clone()
	}

	pub fn count(&self, path: &str) -> usize {
		self.sent.lock().iter().filter(|request| request.path == path).count()
	}
}
impl ApiTransport for ScriptedTransport {
	fn send(&self, request: ApiRequest) -> TransportFuture<'_> {
		self.sent.lock().push(request.clone());

		Box::pin(async move {
			// Hold the exchange open so concurrent 401s pile up behind it.
			if request.path == REFRESH_PATH {
				tokio::time::sleep(self.refresh_delay).await;
			}
			if let Some((_, delay)) = self.delays.iter().find(|(path, _)| *path == request.path) {
				tokio::time::sleep(*delay).await;
			}

			(self.handler)(&request)
		})
	}
}

/// Observer collecting events for assertions.
#[derive(Default)]
pub struct Events(Mutex<Vec<SessionEvent>>);
impl Events {
	pub fn take(&self) -> Vec<SessionEvent> {
		self.0.lock().clone()
	}
}
impl SessionObserver for Events {
	fn notify(&self, event: SessionEvent) {
		self.0.lock().push(event);
	}
}

pub struct Harness {
	pub client: ApiClient<ScriptedTransport>,
	pub transport: Arc<ScriptedTransport>,
	pub store: Arc<TokenStore>,
	pub events: Arc<Events>,
}

pub fn harness(transport: ScriptedTransport) -> Harness {
	let config = ClientConfig::builder(
		Url::parse("http://localhost:8000/api/").expect("Fixture base URL should parse."),
	)
	.build()
	.expect("Fixture config should be valid.");
	let transport = Arc::new(transport);
	let store = Arc::new(TokenStore::in_memory());
	let events = Arc::new(Events::default());
	let client = ApiClient::<ScriptedTransport>::builder(config, transport.clone())
		.store(store.clone())
		.csrf(Arc::new(StaticCsrf::new("csrf-1")))
		.observer(events.clone())
		.build()
		.expect("Fixture client should build.");

	Harness { client, transport, store, events }
}

pub fn json(status: u16, body: Value) -> Result<ApiResponse> {
	Ok(ApiResponse::json_body(
		StatusCode::from_u16(status).expect("Fixture status should be valid."),
		&body,
	))
}

pub fn bearer(request: &ApiRequest) -> Option<String> {
	request.headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()).map(str::to_owned)
}

/// Counts invocations of a scripted responder.
#[derive(Default)]
pub struct Counter(AtomicUsize);
impl Counter {
	pub fn bump(&self) -> usize {
		self.0.fetch_add(1, Ordering::SeqCst) + 1
	}

	pub fn get(&self) -> usize {
		self.0.load(Ordering::SeqCst)
	}
}
