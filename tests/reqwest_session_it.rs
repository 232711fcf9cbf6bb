// crates.io
use httpmock::prelude::*;
use serde_json::{Value, json};
// self
use news_trader_client::{
	_preludet::*,
	auth::{CredentialPair, TokenSecret, Username},
	client::SessionEvent,
};

fn username() -> Username {
	Username::new("ana").expect("Fixture username should be valid.")
}

#[tokio::test]
async fn login_stores_pair_after_csrf_bootstrap() {
	let server = MockServer::start_async().await;
	let (client, store, _) = build_reqwest_test_client(&server.url("/api/"));
	let csrf = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/csrf/");
			then.status(200)
				.header("set-cookie", "csrftoken=csrf-abc; Path=/")
				.json_body(json!({ "detail": "CSRF cookie set" }));
		})
		.await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/token/")
				.header("x-csrftoken", "csrf-abc")
				.json_body(json!({ "username": "ana", "password": "hunter2" }));
			then.status(200).json_body(json!({ "access": "access-1", "refresh": "refresh-1" }));
		})
		.await;

	client.bootstrap_csrf().await.expect("CSRF bootstrap should succeed.");
	client.bootstrap_csrf().await.expect("Second bootstrap should be a no-op.");

	let claims = client.login(&username(), "hunter2").await.expect("Login should succeed.");

	assert!(claims.is_none(), "Opaque fixture tokens carry no decodable claims.");
	assert_eq!(store.access().as_ref().map(TokenSecret::expose), Some("access-1"));
	assert_eq!(store.refresh().as_ref().map(TokenSecret::expose), Some("refresh-1"));

	csrf.assert_calls_async(1).await;
	login.assert_calls_async(1).await;
}

#[tokio::test]
async fn expired_access_refreshes_once_for_concurrent_requests() {
	let server = MockServer::start_async().await;
	let (client, store, _) = build_reqwest_test_client(&server.url("/api/"));
	let stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/news/").header("authorization", "Bearer access-1");
			then.status(401).json_body(json!({ "detail": "Token is expired" }));
		})
		.await;
	let fresh = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/news/").header("authorization", "Bearer access-2");
			then.status(200).json_body(json!({ "results": [{ "title": "Chip rally" }] }));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/token/refresh/")
				.json_body(json!({ "refresh": "refresh-1" }));
			then.status(200)
				.delay(std::time::Duration::from_millis(200))
				.json_body(json!({ "access": "access-2", "refresh": "refresh-2" }));
		})
		.await;

	store.set_pair(CredentialPair::new("access-1", "refresh-1"));

	let (first, second, third) = tokio::join!(
		client.get_json::<Value>("/news/"),
		client.get_json::<Value>("/news/"),
		client.get_json::<Value>("/news/"),
	);

	for body in [first, second, third] {
		let body = body.expect("Each request should succeed after the refresh.");

		assert_eq!(body["results"][0]["title"], "Chip rally");
	}

	refresh.assert_calls_async(1).await;
	stale.assert_calls_async(3).await;
	fresh.assert_calls_async(3).await;

	assert_eq!(store.refresh().as_ref().map(TokenSecret::expose), Some("refresh-2"));
}

#[tokio::test]
async fn rejected_refresh_ends_the_session() {
	let server = MockServer::start_async().await;
	let (client, store, observer) = build_reqwest_test_client(&server.url("/api/"));

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/portfolio/");
			then.status(401).json_body(json!({ "detail": "Token is expired" }));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/token/refresh/");
			then.status(401).json_body(json!({ "detail": "Token is blacklisted" }));
		})
		.await;
	store.set_pair(CredentialPair::new("access-1", "refresh-1"));

	let err = client
		.get_json::<Value>("/portfolio/")
		.await
		.expect_err("A blacklisted refresh token should end the session.");

	assert!(matches!(err, Error::AuthRejected { .. }));
	assert!(store.snapshot().is_empty());
	assert_eq!(observer.events(), vec![SessionEvent::LoggedOut]);
}

#[tokio::test]
async fn rate_limits_and_server_errors_are_classified() {
	let server = MockServer::start_async().await;
	let (client, _, _) = build_reqwest_test_client(&server.url("/api/"));

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/stocks/");
			then.status(429)
				.header("retry-after", "30")
				.json_body(json!({ "detail": "Request was throttled." }));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/news/");
			then.status(503).body("upstream unavailable");
		})
		.await;

	let throttled =
		client.get_json::<Value>("/stocks/").await.expect_err("Throttled request should fail.");

	assert!(matches!(
		throttled,
		Error::RateLimited { ref message, retry_after: Some(after) }
			if message == "Request was throttled." && after == Duration::seconds(30)
	));
	assert!(throttled.is_transient());

	let unavailable =
		client.get_json::<Value>("/news/").await.expect_err("Server errors should fail.");

	assert!(matches!(unavailable, Error::ServerError { status: 503, .. }));
	assert_eq!(unavailable.notice().message, "Server error. Try again later.");
}

#[tokio::test]
async fn logout_clears_tokens_even_when_the_server_fails() {
	let server = MockServer::start_async().await;
	let (client, store, observer) = build_reqwest_test_client(&server.url("/api/"));
	let logout = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/logout/").header("authorization", "Bearer access-1");
			then.status(500);
		})
		.await;

	store.set_pair(CredentialPair::new("access-1", "refresh-1"));
	client.logout().await;

	logout.assert_calls_async(1).await;

	assert!(store.snapshot().is_empty());
	assert_eq!(observer.events(), vec![SessionEvent::LoggedOut]);
}

#[tokio::test]
async fn verify_reports_session_validity() {
	let server = MockServer::start_async().await;
	let (client, store, _) = build_reqwest_test_client(&server.url("/api/"));

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/auth/verify/").header("authorization", "Bearer access-1");
			then.status(200).json_body(json!({ "valid": true }));
		})
		.await;
	store.set_pair(CredentialPair::new("access-1", "refresh-1"));

	assert!(client.verify().await.expect("Verification should succeed."));

	store.clear_all();
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/auth/verify/");
			then.status(401)
				.json_body(json!({ "detail": "Authentication credentials were not provided." }));
		})
		.await;

	assert!(!client.verify().await.expect("Rejected sessions should report false."));
}
