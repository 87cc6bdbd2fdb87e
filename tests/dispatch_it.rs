// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use checkin_push::{
	BatchSummary, DeliveryResult, Dispatcher, NotificationRequest, ServiceAccount,
	ServiceAccountKey,
	error::{Error, InvalidRequestError, TransportError},
	http::{HttpFuture, HttpReply, PushHttpClient, ReqwestHttpClient},
	templates,
	url::Url,
};

mod common;

const PRIVATE_KEY: &str = include_str!("fixtures/service_account_key.pem");
const PROJECT_ID: &str = "are-you-dead";
const SEND_PATH: &str = "/v1/projects/are-you-dead/messages:send";

fn build_dispatcher(server: &MockServer) -> Dispatcher<ReqwestHttpClient> {
	let account = ServiceAccount {
		project_id: PROJECT_ID.into(),
		key: ServiceAccountKey::new(
			"push@are-you-dead.iam.gserviceaccount.com",
			PRIVATE_KEY,
			Url::parse(&server.url("/token")).expect("Mock token endpoint should parse."),
		),
	};
	let endpoint = Url::parse(&server.url(SEND_PATH)).expect("Mock send endpoint should parse.");

	Dispatcher::with_http_client(account, common::test_reqwest_http_client())
		.expect("Dispatcher should build.")
		.with_endpoint(endpoint)
}

async fn mock_token_endpoint(server: &MockServer) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"T1\",\"expires_in\":3600,\"token_type\":\"Bearer\"}");
		})
		.await
}

#[tokio::test]
async fn delivered_message_reuses_the_cached_token() {
	let server = MockServer::start_async().await;
	let token_mock = mock_token_endpoint(&server).await;
	let send_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(SEND_PATH)
				.header("authorization", "Bearer T1")
				.header("content-type", "application/json")
				.json_body(json!({ "message": {
					"token": "device-1",
					"notification": {
						"title": "Alert Sent",
						"body": "Your emergency contacts have been notified. Check in now to let them know you're OK."
					},
					"data": { "click_action": "FLUTTER_NOTIFICATION_CLICK", "route": "/", "urgent": "true" },
					"android": { "priority": "high", "notification": { "channel_id": "urgent_alerts" } }
				}}));
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"name\":\"projects/are-you-dead/messages/0:1\"}");
		})
		.await;
	let dispatcher = build_dispatcher(&server);
	let request = templates::alert_sent_request("device-1");

	assert_eq!(dispatcher.send(&request).await, DeliveryResult::delivered());
	assert_eq!(dispatcher.send(&request).await, DeliveryResult::delivered());

	token_mock.assert_calls_async(1).await;
	send_mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn rejected_message_reports_provider_body() {
	let server = MockServer::start_async().await;

	mock_token_endpoint(&server).await;
	server
		.mock_async(|when, then| {
			when.method(POST).path(SEND_PATH);
			then.status(404).body("{\"error\":\"NotRegistered\"}");
		})
		.await;

	let result = build_dispatcher(&server)
		.send(&NotificationRequest::new("stale-device", "x", "y"))
		.await;

	assert_eq!(
		result,
		DeliveryResult { success: false, error: Some("{\"error\":\"NotRegistered\"}".into()) }
	);
}

#[tokio::test]
async fn empty_device_token_never_touches_the_network() {
	let server = MockServer::start_async().await;
	let token_mock = mock_token_endpoint(&server).await;
	let send_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(SEND_PATH);
			then.status(200).body("{}");
		})
		.await;
	let dispatcher = build_dispatcher(&server);
	let request = NotificationRequest::new("", "x", "y");
	let err = dispatcher.try_send(&request).await.expect_err("Empty token should be rejected.");

	assert!(matches!(err, Error::InvalidRequest(InvalidRequestError::EmptyDeviceToken)));

	let result = dispatcher.send(&request).await;

	assert!(!result.success);
	assert_eq!(result.error.as_deref(), Some("Device token must not be empty."));

	token_mock.assert_calls_async(0).await;
	send_mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn unreachable_endpoint_yields_failure_text() -> color_eyre::Result<()> {
	let server = MockServer::start_async().await;

	mock_token_endpoint(&server).await;

	let dispatcher =
		build_dispatcher(&server).with_endpoint(Url::parse("http://127.0.0.1:1/messages:send")?);
	let result = dispatcher.send(&NotificationRequest::new("device-1", "x", "y")).await;

	assert!(!result.success);

	let error = result.error.unwrap_or_default();

	assert!(error.starts_with("Message endpoint could not be reached"), "{error}");

	Ok(())
}

#[tokio::test]
async fn token_failure_is_folded_into_the_result() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(400).body("{\"error\":\"invalid_grant\"}");
		})
		.await;

	let send_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(SEND_PATH);
			then.status(200).body("{}");
		})
		.await;
	let result = build_dispatcher(&server).send(&NotificationRequest::new("device-1", "x", "y")).await;

	assert!(!result.success);
	assert_eq!(
		result.error.as_deref(),
		Some("Token endpoint rejected the assertion with status 400: {\"error\":\"invalid_grant\"}")
	);

	send_mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn oversized_token_lifetime_fails_without_panicking() {
	struct EndlessTokenHttpClient;
	impl PushHttpClient for EndlessTokenHttpClient {
		fn post_form<'a>(&'a self, _url: &'a Url, _form: &'a [(&'a str, &'a str)]) -> HttpFuture<'a> {
			Box::pin(async {
				Ok::<_, TransportError>(HttpReply::new(
					200,
					"{\"access_token\":\"T1\",\"expires_in\":300000000000}",
				))
			})
		}

		fn post_json<'a>(&'a self, _url: &'a Url, _bearer: &'a str, _body: Vec<u8>) -> HttpFuture<'a> {
			Box::pin(async { Ok::<_, TransportError>(HttpReply::new(200, "{}")) })
		}
	}

	let account = ServiceAccount {
		project_id: PROJECT_ID.into(),
		key: ServiceAccountKey::new(
			"push@are-you-dead.iam.gserviceaccount.com",
			PRIVATE_KEY,
			Url::parse("https://oauth2.googleapis.com/token").expect("Token endpoint should parse."),
		),
	};
	let dispatcher =
		Dispatcher::<EndlessTokenHttpClient>::with_http_client(account, EndlessTokenHttpClient)
			.expect("Dispatcher should build.");
	let result = dispatcher.send(&NotificationRequest::new("device-1", "x", "y")).await;

	assert_eq!(
		result,
		DeliveryResult::failed("The expires_in value 300000000000 is out of range.")
	);
	assert!(dispatcher.token_cache.snapshot().await.is_none());
}

#[tokio::test]
async fn batch_counts_each_outcome() {
	let server = MockServer::start_async().await;
	let token_mock = mock_token_endpoint(&server).await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(SEND_PATH);
			then.status(200).body("{}");
		})
		.await;

	let [day, six, hour] = templates::REMINDER_WINDOWS;
	let requests =
		[day.request_for("device-1"), six.request_for(""), hour.request_for("device-3")];
	let summary = build_dispatcher(&server).send_batch(&requests).await;

	assert_eq!(summary, BatchSummary { sent: 2, failed: 1 });

	token_mock.assert_calls_async(1).await;
}
