//! Service-account JWT assertions for the `jwt-bearer` grant.

// crates.io
use base64::{DecodeError, Engine, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::{
	_prelude::*, auth::signer::RsaSigner, config::ServiceAccountKey, error::KeyFormatError,
};

/// OAuth2 grant type used to trade a signed assertion for an access token.
pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Scope requested for message delivery.
pub const MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
/// Distance between `iat` and `exp`.
pub const ASSERTION_LIFETIME: Duration = Duration::seconds(3600);

/// Encodes bytes as base64url without padding.
pub fn base64_url_encode(bytes: impl AsRef<[u8]>) -> String {
	URL_SAFE_NO_PAD.encode(bytes)
}

/// Decodes an unpadded base64url segment.
pub fn base64_url_decode(segment: &str) -> Result<Vec<u8>, DecodeError> {
	URL_SAFE_NO_PAD.decode(segment)
}

/// JOSE header of an assertion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionHeader {
	/// Signature algorithm.
	pub alg: String,
	/// Token type.
	pub typ: String,
	/// Identifier of the signing key, when the service account names one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub kid: Option<String>,
}
impl AssertionHeader {
	/// Builds the header for `key`, carrying its `private_key_id` as `kid`.
	pub fn for_key(key: &ServiceAccountKey) -> Self {
		Self { kid: key.private_key_id.clone(), ..Default::default() }
	}
}
impl Default for AssertionHeader {
	fn default() -> Self {
		Self { alg: "RS256".into(), typ: "JWT".into(), kid: None }
	}
}

/// Claims carried by a service-account assertion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
	/// Issuer (service-account email).
	pub iss: String,
	/// Subject; always equal to the issuer.
	pub sub: String,
	/// Audience (token endpoint).
	pub aud: String,
	/// Issued-at, Unix seconds.
	pub iat: i64,
	/// Expiry, Unix seconds; `iat + 3600`.
	pub exp: i64,
	/// Requested OAuth2 scope.
	pub scope: String,
}
impl AssertionClaims {
	/// Builds the messaging claims for `key`, issued at `issued_at`.
	pub fn new(key: &ServiceAccountKey, issued_at: OffsetDateTime) -> Self {
		let iat = issued_at.unix_timestamp();

		Self {
			iss: key.issuer.clone(),
			sub: key.issuer.clone(),
			aud: key.token_endpoint.to_string(),
			iat,
			exp: iat + ASSERTION_LIFETIME.whole_seconds(),
			scope: MESSAGING_SCOPE.into(),
		}
	}

	/// Overrides the requested scope.
	pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
		self.scope = scope.into();

		self
	}
}

/// Compact `header.claims.signature` assertion; single use.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedAssertion(String);
impl SignedAssertion {
	/// Serializes, encodes, and signs `header` and `claims`.
	pub fn sign(
		header: &AssertionHeader,
		claims: &AssertionClaims,
		signer: &RsaSigner,
	) -> Result<Self, KeyFormatError> {
		let header = encode_segment(header)?;
		let payload = encode_segment(claims)?;
		let signing_input = format!("{header}.{payload}");
		let signature = signer.sign(signing_input.as_bytes())?;

		Ok(Self(format!("{signing_input}.{signature}")))
	}

	/// Returns the compact serialization. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Iterates over the three encoded segments.
	pub fn segments(&self) -> impl Iterator<Item = &str> {
		self.0.split('.')
	}
}
impl Debug for SignedAssertion {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("SignedAssertion(<redacted>)")
	}
}

fn encode_segment<T>(value: &T) -> Result<String, KeyFormatError>
where
	T: Serialize,
{
	let json = serde_json::to_vec(value).map_err(|source| KeyFormatError::Encode { source })?;

	Ok(base64_url_encode(json))
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	const TEST_KEY: &str = include_str!("../../tests/fixtures/service_account_key.pem");

	fn key() -> ServiceAccountKey {
		ServiceAccountKey::new(
			"push@checkin.iam.gserviceaccount.com",
			TEST_KEY,
			Url::parse("https://oauth2.googleapis.com/token").expect("Token URL should parse."),
		)
	}

	#[test]
	fn claims_span_exactly_one_hour() {
		let claims = AssertionClaims::new(&key(), datetime!(2026-03-01 12:00 UTC));

		assert_eq!(claims.exp - claims.iat, 3600);
		assert_eq!(claims.iat, 1_772_366_400);
		assert_eq!(claims.iss, claims.sub);
		assert_eq!(claims.aud, "https://oauth2.googleapis.com/token");
		assert_eq!(claims.scope, MESSAGING_SCOPE);
	}

	#[test]
	fn signed_assertion_has_three_url_safe_segments() {
		let signer = RsaSigner::from_pem(TEST_KEY).expect("Fixture key should decode.");
		let claims = AssertionClaims::new(&key(), datetime!(2026-03-01 12:00 UTC));
		let assertion = SignedAssertion::sign(&AssertionHeader::default(), &claims, &signer)
			.expect("Signing should succeed.");
		let segments = assertion.segments().collect::<Vec<_>>();

		assert_eq!(segments.len(), 3);

		for segment in &segments {
			assert!(!segment.is_empty());
			assert!(!segment.contains(['+', '/', '=']), "Segment `{segment}` is not base64url.");
		}

		let header: AssertionHeader = serde_json::from_slice(
			&base64_url_decode(segments[0]).expect("Header should decode."),
		)
		.expect("Header should be JSON.");
		let decoded: AssertionClaims = serde_json::from_slice(
			&base64_url_decode(segments[1]).expect("Claims should decode."),
		)
		.expect("Claims should be JSON.");

		assert_eq!(header, AssertionHeader::default());
		assert_eq!(decoded, claims);
		assert_eq!(format!("{assertion:?}"), "SignedAssertion(<redacted>)");
	}

	#[test]
	fn header_carries_key_id_only_when_known() {
		let anonymous = serde_json::to_value(AssertionHeader::for_key(&key()))
			.expect("Header should serialize.");

		assert_eq!(anonymous, serde_json::json!({ "alg": "RS256", "typ": "JWT" }));

		let key = key().with_private_key_id("abc123");
		let named =
			serde_json::to_value(AssertionHeader::for_key(&key)).expect("Header should serialize.");

		assert_eq!(named, serde_json::json!({ "alg": "RS256", "typ": "JWT", "kid": "abc123" }));
	}

	#[test]
	fn scope_override_replaces_messaging_scope() {
		let claims = AssertionClaims::new(&key(), datetime!(2026-03-01 12:00 UTC))
			.with_scope("https://www.googleapis.com/auth/cloud-platform");

		assert_eq!(claims.scope, "https://www.googleapis.com/auth/cloud-platform");
	}

	#[test]
	fn encoding_round_trips_arbitrary_bytes() {
		let samples: [&[u8]; 5] = [b"", b"\xfb\xff", b"\x00\x01\x02\xfe", b"?>?>", &[0xff; 31]];

		for bytes in samples {
			let encoded = base64_url_encode(bytes);

			assert!(!encoded.contains(['+', '/', '=']));
			assert_eq!(base64_url_decode(&encoded).expect("Encoded bytes should decode."), bytes);
			assert_eq!(
				base64_url_encode(base64_url_decode(&encoded).expect("Segment should decode.")),
				encoded
			);
		}
	}
}
