//! Message dispatch against the provider's per-project send endpoint.
//!
//! [`Dispatcher::send`] is the public entry point used by schedulers: it validates the request,
//! obtains a bearer token from the shared [`TokenCache`], submits the JSON envelope, and folds
//! every failure (caller error, key problem, token endpoint rejection, message endpoint
//! rejection, transport failure) into a [`DeliveryResult`]. [`Dispatcher::try_send`] runs the
//! same steps but keeps the typed [`Error`] for callers that need to branch on the failure kind.
//! Configuration problems never reach either method; they surface from the constructors.

// self
use crate::{
	_prelude::*,
	auth::JwtBearerExchanger,
	cache::TokenCache,
	config::ServiceAccount,
	error::{ConfigError, DeliveryError},
	http::PushHttpClient,
	message::NotificationRequest,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

const SEND_ENDPOINT_BASE: &str = "https://fcm.googleapis.com/v1/projects";

/// Dispatcher specialized for the crate's default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestDispatcher = Dispatcher<ReqwestHttpClient>;

/// Outcome of one send call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryResult {
	/// `true` when the provider accepted the message.
	pub success: bool,
	/// Failure description for logs; present exactly when `success` is `false`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}
impl DeliveryResult {
	/// Accepted message.
	pub fn delivered() -> Self {
		Self { success: true, error: None }
	}

	/// Failed message; an empty description is replaced so `error` is never blank.
	pub fn failed(error: impl Into<String>) -> Self {
		let error = error.into();
		let error = if error.trim().is_empty() { "Unknown delivery failure.".into() } else { error };

		Self { success: false, error: Some(error) }
	}
}
impl From<Result<()>> for DeliveryResult {
	fn from(result: Result<()>) -> Self {
		match result {
			Ok(()) => Self::delivered(),
			Err(Error::Delivery(DeliveryError::Rejected { status, body })) =>
				if body.trim().is_empty() {
					Self::failed(format!("HTTP {status}"))
				} else {
					Self::failed(body)
				},
			Err(err) => Self::failed(err.to_string()),
		}
	}
}

/// Counters for a batch of sends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
	/// Messages accepted by the provider.
	pub sent: usize,
	/// Messages that failed for any reason.
	pub failed: usize,
}

/// Sends notifications for one service account.
///
/// The dispatcher owns the HTTP client, the service account, and a shared handle to the token
/// cache. Clones share the same cache, so a host can hand copies to concurrent jobs and still
/// perform at most one token exchange at a time.
pub struct Dispatcher<C>
where
	C: ?Sized + PushHttpClient,
{
	/// HTTP client used for message submission.
	pub http_client: Arc<C>,
	/// Token cache consulted before every submission.
	pub token_cache: Arc<TokenCache>,
	/// Service account the messages are sent as.
	pub account: Arc<ServiceAccount>,
	/// Send endpoint; defaults to the project's FCM v1 `messages:send` URL.
	pub endpoint: Url,
}
impl<C> Dispatcher<C>
where
	C: ?Sized + PushHttpClient,
{
	/// Creates a dispatcher whose token cache exchanges through the same `http_client`.
	pub fn with_http_client(
		account: ServiceAccount,
		http_client: impl Into<Arc<C>>,
	) -> Result<Self, ConfigError> {
		let http_client = http_client.into();
		let exchanger = JwtBearerExchanger::<C>::new(http_client.clone());
		let token_cache = Arc::new(TokenCache::new(Arc::new(exchanger)));

		Self::with_token_cache(account, http_client, token_cache)
	}

	/// Creates a dispatcher around an existing (possibly shared) token cache.
	pub fn with_token_cache(
		account: ServiceAccount,
		http_client: impl Into<Arc<C>>,
		token_cache: Arc<TokenCache>,
	) -> Result<Self, ConfigError> {
		let endpoint = send_endpoint(&account.project_id)?;

		Ok(Self { http_client: http_client.into(), token_cache, account: Arc::new(account), endpoint })
	}

	/// Overrides the send endpoint.
	pub fn with_endpoint(mut self, endpoint: Url) -> Self {
		self.endpoint = endpoint;

		self
	}

	/// Sends `request` and reports the outcome; never returns an error.
	pub async fn send(&self, request: &NotificationRequest) -> DeliveryResult {
		DeliveryResult::from(self.try_send(request).await)
	}

	/// Sends `request`, keeping the typed error on failure.
	pub async fn try_send(&self, request: &NotificationRequest) -> Result<()> {
		const KIND: FlowKind = FlowKind::Dispatch;

		let span = FlowSpan::new(KIND, "send");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.submit(request)).await;

		match &result {
			Ok(()) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(err) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
				obs::record_failure(KIND, err);
			},
		}

		result
	}

	/// Sends each request in order and counts the outcomes.
	pub async fn send_batch<'r, I>(&self, requests: I) -> BatchSummary
	where
		I: IntoIterator<Item = &'r NotificationRequest>,
	{
		let mut summary = BatchSummary::default();

		for request in requests {
			if self.send(request).await.success {
				summary.sent += 1;
			} else {
				summary.failed += 1;
			}
		}

		summary
	}

	async fn submit(&self, request: &NotificationRequest) -> Result<()> {
		request.validate()?;

		let token = self.token_cache.get_token(&self.account.key).await?;
		let body = serde_json::to_vec(&request.envelope())
			.map_err(|source| DeliveryError::Encode { source })?;
		let reply = self
			.http_client
			.post_json(&self.endpoint, token.expose(), body)
			.await
			.map_err(DeliveryError::Transport)?;

		if reply.is_success() {
			Ok(())
		} else {
			Err(DeliveryError::Rejected { status: reply.status, body: reply.body_text() }.into())
		}
	}
}
#[cfg(feature = "reqwest")]
impl Dispatcher<ReqwestHttpClient> {
	/// Creates a dispatcher with its own reqwest transport and token cache.
	pub fn new(account: ServiceAccount) -> Result<Self, ConfigError> {
		Self::with_http_client(account, ReqwestHttpClient::new()?)
	}

	/// Creates a dispatcher from the service account in
	/// [`SERVICE_ACCOUNT_ENV`](crate::config::SERVICE_ACCOUNT_ENV).
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::new(ServiceAccount::from_env()?)
	}
}
impl<C> Clone for Dispatcher<C>
where
	C: ?Sized + PushHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			token_cache: self.token_cache.clone(),
			account: self.account.clone(),
			endpoint: self.endpoint.clone(),
		}
	}
}
impl<C> Debug for Dispatcher<C>
where
	C: ?Sized + PushHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Dispatcher")
			.field("project_id", &self.account.project_id)
			.field("issuer", &self.account.key.issuer)
			.field("endpoint", &self.endpoint.as_str())
			.finish()
	}
}

fn send_endpoint(project_id: &str) -> Result<Url, ConfigError> {
	Url::parse(&format!("{SEND_ENDPOINT_BASE}/{project_id}/messages:send"))
		.map_err(|source| ConfigError::InvalidUrl { field: "project_id", source })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::{InvalidRequestError, TokenExchangeError};

	#[test]
	fn send_endpoint_embeds_project() {
		let url = send_endpoint("are-you-dead").expect("Endpoint should build.");

		assert_eq!(url.as_str(), "https://fcm.googleapis.com/v1/projects/are-you-dead/messages:send");
	}

	#[test]
	fn rejected_bodies_become_the_error_verbatim() {
		let result = DeliveryResult::from(Err(Error::from(DeliveryError::Rejected {
			status: 404,
			body: "{\"error\":\"NotRegistered\"}".into(),
		})));

		assert_eq!(result, DeliveryResult::failed("{\"error\":\"NotRegistered\"}"));

		let empty = DeliveryResult::from(Err(Error::from(DeliveryError::Rejected {
			status: 503,
			body: String::new(),
		})));

		assert_eq!(empty.error.as_deref(), Some("HTTP 503"));
	}

	#[test]
	fn other_failures_use_their_display_text() {
		let invalid = DeliveryResult::from(Err(InvalidRequestError::EmptyDeviceToken.into()));

		assert_eq!(invalid.error.as_deref(), Some("Device token must not be empty."));

		let exchange = DeliveryResult::from(Err(TokenExchangeError::EmptyAccessToken.into()));

		assert!(!exchange.success);
		assert_eq!(exchange.error.as_deref(), Some("Token endpoint returned an empty access token."));
	}

	#[test]
	fn results_serialize_like_the_wire_contract() {
		assert_eq!(
			serde_json::to_string(&DeliveryResult::delivered()).expect("Result should serialize."),
			"{\"success\":true}"
		);
		assert_eq!(DeliveryResult::failed("  ").error.as_deref(), Some("Unknown delivery failure."));
	}
}
