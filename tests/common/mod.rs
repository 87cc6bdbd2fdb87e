// self
use checkin_push::{http::ReqwestHttpClient, reqwest::Client};

/// Builds a reqwest transport that accepts the self-signed certificates served by `httpmock`.
pub fn test_reqwest_http_client() -> ReqwestHttpClient {
	let client = Client::builder()
		.redirect(checkin_push::reqwest::redirect::Policy::none())
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}
