//! Assertion-for-token exchange against the provider's OAuth2 token endpoint.

// self
use crate::{
	_prelude::*,
	auth::{
		AccessToken,
		assertion::{AssertionClaims, AssertionHeader, JWT_BEARER_GRANT_TYPE, SignedAssertion},
		signer::RsaSigner,
	},
	clock::{Clock, SystemClock},
	config::ServiceAccountKey,
	error::TokenExchangeError,
	http::PushHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Boxed future returned by [`TokenExchanger::exchange`].
pub type ExchangeFuture<'a> = Pin<Box<dyn Future<Output = Result<IssuedToken>> + 'a + Send>>;

/// Produces fresh access tokens for a service account.
///
/// [`TokenCache`](crate::cache::TokenCache) calls this only on a miss; implementations do not
/// cache anything themselves.
pub trait TokenExchanger
where
	Self: Send + Sync,
{
	/// Mints a new token for `key`.
	fn exchange<'a>(&'a self, key: &'a ServiceAccountKey) -> ExchangeFuture<'a>;
}

/// Token returned by the provider together with its declared lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedToken {
	/// Bearer token.
	pub access_token: AccessToken,
	/// Provider-declared time to live.
	pub expires_in: Duration,
}
impl IssuedToken {
	/// Creates a token from its parts.
	pub fn new(access_token: impl Into<String>, expires_in: Duration) -> Self {
		Self { access_token: AccessToken::new(access_token), expires_in }
	}
}

/// Signs a service-account assertion and trades it for a bearer token.
pub struct JwtBearerExchanger<C>
where
	C: ?Sized + PushHttpClient,
{
	http_client: Arc<C>,
	clock: Arc<dyn Clock>,
	scope: Option<String>,
}
impl<C> JwtBearerExchanger<C>
where
	C: ?Sized + PushHttpClient,
{
	/// Creates an exchanger that reads the system clock.
	pub fn new(http_client: impl Into<Arc<C>>) -> Self {
		Self { http_client: http_client.into(), clock: Arc::new(SystemClock), scope: None }
	}

	/// Replaces the clock used for `iat`/`exp`.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Requests `scope` instead of the messaging scope.
	pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
		self.scope = Some(scope.into());

		self
	}

	/// Builds and signs the assertion for `key` at the current clock instant.
	pub fn assertion_for(&self, key: &ServiceAccountKey) -> Result<SignedAssertion> {
		let signer = RsaSigner::from_pem(key.private_key.expose())?;
		let mut claims = AssertionClaims::new(key, self.clock.now());

		if let Some(scope) = &self.scope {
			claims = claims.with_scope(scope.clone());
		}

		Ok(SignedAssertion::sign(&AssertionHeader::for_key(key), &claims, &signer)?)
	}

	async fn request_token(&self, key: &ServiceAccountKey) -> Result<IssuedToken> {
		let assertion = self.assertion_for(key)?;
		let form = [("grant_type", JWT_BEARER_GRANT_TYPE), ("assertion", assertion.expose())];
		let reply = self
			.http_client
			.post_form(&key.token_endpoint, &form)
			.await
			.map_err(TokenExchangeError::Transport)?;

		if !reply.is_success() {
			return Err(TokenExchangeError::Rejected {
				status: reply.status,
				body: reply.body_text(),
			}
			.into());
		}

		Ok(parse_token_response(reply.status, &reply.body)?)
	}
}
impl<C> TokenExchanger for JwtBearerExchanger<C>
where
	C: ?Sized + PushHttpClient,
{
	fn exchange<'a>(&'a self, key: &'a ServiceAccountKey) -> ExchangeFuture<'a> {
		const KIND: FlowKind = FlowKind::TokenExchange;

		let span = FlowSpan::new(KIND, "exchange");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		Box::pin(async move {
			let result = span.instrument(self.request_token(key)).await;

			match &result {
				Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
				Err(err) => {
					obs::record_flow_outcome(KIND, FlowOutcome::Failure);
					obs::record_failure(KIND, err);
				},
			}

			result
		})
	}
}
impl<C> Debug for JwtBearerExchanger<C>
where
	C: ?Sized + PushHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("JwtBearerExchanger").field("scope", &self.scope).finish()
	}
}

#[derive(Deserialize)]
struct TokenResponse {
	access_token: String,
	expires_in: i64,
}

fn parse_token_response(status: u16, body: &[u8]) -> Result<IssuedToken, TokenExchangeError> {
	let mut de = serde_json::Deserializer::from_slice(body);
	let response: TokenResponse = serde_path_to_error::deserialize(&mut de)
		.map_err(|source| TokenExchangeError::MalformedResponse { source, status })?;

	if response.access_token.trim().is_empty() {
		return Err(TokenExchangeError::EmptyAccessToken);
	}
	if response.expires_in <= 0 {
		return Err(TokenExchangeError::NonPositiveExpiresIn);
	}

	Ok(IssuedToken::new(response.access_token, Duration::seconds(response.expires_in)))
}
