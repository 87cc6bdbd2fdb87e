//! Service-account configuration loading and validation.
//!
//! The provider hands out credentials as a JSON document (`type`, `project_id`,
//! `private_key`, `client_email`, `token_uri`, ...). [`ServiceAccount`] parses that
//! document once, checks the fields the delivery path depends on, and splits it into the
//! project identifier and the immutable [`ServiceAccountKey`] used for signing. Every
//! failure here is a [`ConfigError`], reported before any network call is made.

// std
use std::path::Path;
// self
use crate::{_prelude::*, auth::PrivateKeyPem, error::ConfigError};

/// Environment variable read by [`ServiceAccount::from_env`].
pub const SERVICE_ACCOUNT_ENV: &str = "FCM_SERVICE_ACCOUNT";

const SERVICE_ACCOUNT_TYPE: &str = "service_account";

/// Immutable signing identity: issuer, private key, and token endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceAccountKey {
	/// Issuer identity (`client_email`), used as both `iss` and `sub`.
	pub issuer: String,
	/// PKCS#8 RSA private key in PEM form.
	pub private_key: PrivateKeyPem,
	/// OAuth2 token endpoint (`token_uri`), also the assertion audience.
	pub token_endpoint: Url,
	/// Key identifier, when the provider supplied one.
	pub private_key_id: Option<String>,
}
impl ServiceAccountKey {
	/// Builds a key record from its parts.
	pub fn new(
		issuer: impl Into<String>,
		private_key: impl Into<String>,
		token_endpoint: Url,
	) -> Self {
		Self {
			issuer: issuer.into(),
			private_key: PrivateKeyPem::new(private_key),
			token_endpoint,
			private_key_id: None,
		}
	}

	/// Attaches the provider's key identifier.
	pub fn with_private_key_id(mut self, id: impl Into<String>) -> Self {
		self.private_key_id = Some(id.into());

		self
	}
}

/// Parsed service-account configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceAccount {
	/// Provider project identifier used to build the send endpoint.
	pub project_id: String,
	/// Signing identity.
	pub key: ServiceAccountKey,
}
impl ServiceAccount {
	/// Reads the service account JSON from [`SERVICE_ACCOUNT_ENV`].
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_env_var(SERVICE_ACCOUNT_ENV)
	}

	/// Reads the service account JSON from the named environment variable.
	pub fn from_env_var(name: &str) -> Result<Self, ConfigError> {
		let raw = std::env::var(name)
			.ok()
			.filter(|value| !value.trim().is_empty())
			.ok_or_else(|| ConfigError::MissingVariable { name: name.to_owned() })?;

		Self::from_json(&raw)
	}

	/// Reads the service account JSON from a file.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
			path: path.display().to_string(),
			source,
		})?;

		Self::from_json(&raw)
	}

	/// Parses and validates a service account JSON document.
	pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_str(raw);
		let document: ServiceAccountDocument = serde_path_to_error::deserialize(&mut de)
			.map_err(|source| ConfigError::Parse { source })?;

		document.validate()
	}
}
impl FromStr for ServiceAccount {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::from_json(s)
	}
}

#[derive(Deserialize)]
struct ServiceAccountDocument {
	#[serde(rename = "type", default)]
	kind: Option<String>,
	project_id: String,
	#[serde(default)]
	private_key_id: Option<String>,
	private_key: String,
	client_email: String,
	token_uri: String,
}
impl ServiceAccountDocument {
	fn validate(self) -> Result<ServiceAccount, ConfigError> {
		if let Some(kind) = self.kind.filter(|kind| kind != SERVICE_ACCOUNT_TYPE) {
			return Err(ConfigError::UnsupportedAccountType { kind });
		}

		let project_id = required("project_id", self.project_id)?;
		let issuer = required("client_email", self.client_email)?;
		let private_key = required("private_key", self.private_key)?;
		let token_uri = required("token_uri", self.token_uri)?;
		let token_endpoint = Url::parse(&token_uri)
			.map_err(|source| ConfigError::InvalidUrl { field: "token_uri", source })?;
		let mut key = ServiceAccountKey::new(issuer, private_key, token_endpoint);

		if let Some(id) = self.private_key_id.filter(|id| !id.trim().is_empty()) {
			key = key.with_private_key_id(id);
		}

		Ok(ServiceAccount { project_id, key })
	}
}

fn required(field: &'static str, value: String) -> Result<String, ConfigError> {
	if value.trim().is_empty() { Err(ConfigError::MissingField { field }) } else { Ok(value) }
}
