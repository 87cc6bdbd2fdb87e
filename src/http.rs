//! Transport primitives for the token and message endpoints.
//!
//! [`PushHttpClient`] is the crate's only dependency on an HTTP stack. The token exchange
//! uses [`PushHttpClient::post_form`] and the dispatcher uses [`PushHttpClient::post_json`];
//! both resolve to an [`HttpReply`] for any HTTP status and reserve `Err` for failures where
//! no response arrived at all (DNS, TCP, TLS, timeouts).

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`PushHttpClient`] calls.
pub type HttpFuture<'a> = Pin<Box<dyn Future<Output = Result<HttpReply, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports used by the signer and the dispatcher.
///
/// Implementations must be `Send + Sync + 'static` so a single client can be shared between
/// the token exchanger and the dispatcher behind an `Arc`. Redirects should not be followed:
/// both endpoints answer directly.
pub trait PushHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Sends `form` as `application/x-www-form-urlencoded` to `url`.
	fn post_form<'a>(&'a self, url: &'a Url, form: &'a [(&'a str, &'a str)]) -> HttpFuture<'a>;

	/// Sends `body` as `application/json` to `url` with a bearer `Authorization` header.
	fn post_json<'a>(&'a self, url: &'a Url, bearer: &'a str, body: Vec<u8>) -> HttpFuture<'a>;
}

/// Status and body of a completed HTTP exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpReply {
	/// HTTP status code.
	pub status: u16,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl HttpReply {
	/// Creates a reply from its parts.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, body: body.into() }
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns the body as text, replacing invalid UTF-8.
	pub fn body_text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Builds a client that never follows redirects.
	pub fn new() -> Result<Self, crate::error::ConfigError> {
		let client = ReqwestClient::builder().redirect(reqwest::redirect::Policy::none()).build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	async fn finish(
		request: reqwest::RequestBuilder,
	) -> Result<HttpReply, TransportError> {
		let response = request.send().await?;
		let status = response.status().as_u16();
		let body = response.bytes().await?;

		Ok(HttpReply::new(status, body.to_vec()))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl PushHttpClient for ReqwestHttpClient {
	fn post_form<'a>(&'a self, url: &'a Url, form: &'a [(&'a str, &'a str)]) -> HttpFuture<'a> {
		let request = self.0.post(url.clone()).form(form);

		Box::pin(Self::finish(request))
	}

	fn post_json<'a>(&'a self, url: &'a Url, bearer: &'a str, body: Vec<u8>) -> HttpFuture<'a> {
		let request = self
			.0
			.post(url.clone())
			.bearer_auth(bearer)
			.header(reqwest::header::CONTENT_TYPE, "application/json")
			.body(body);

		Box::pin(Self::finish(request))
	}
}
