//! Notification request model and the provider's message envelope.
//!
//! Every optional part of a request is an explicit `Option` (or an empty map) that is skipped
//! on serialization, so absent hints never reach the wire as `null` or `{}`.

// self
use crate::{_prelude::*, error::InvalidRequestError};

/// Title/body pair shown by the device.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
	/// Notification title.
	pub title: String,
	/// Notification body.
	pub body: String,
}
impl Notification {
	/// Creates a notification.
	pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
		Self { title: title.into(), body: body.into() }
	}
}

/// Android delivery priority.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AndroidPriority {
	/// Default delivery.
	Normal,
	/// Wake the device immediately.
	High,
}

/// Android notification options.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AndroidNotification {
	/// Notification channel the app registered.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub channel_id: Option<String>,
}

/// Android-specific delivery hints.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AndroidConfig {
	/// Delivery priority.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub priority: Option<AndroidPriority>,
	/// Notification options.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub notification: Option<AndroidNotification>,
}

/// The `aps` dictionary of an APNs payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aps {
	/// Sound file name, e.g. `default`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sound: Option<String>,
	/// App icon badge count.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub badge: Option<u32>,
}

/// APNs payload wrapper.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApnsPayload {
	/// The `aps` dictionary.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub aps: Option<Aps>,
}

/// APNs-specific delivery hints.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApnsConfig {
	/// Payload forwarded to APNs.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub payload: Option<ApnsPayload>,
}

/// A push addressed to one device.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
	/// Target device registration token.
	pub token: String,
	/// Visible notification.
	pub notification: Notification,
	/// Auxiliary key/value data delivered to the app.
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub data: BTreeMap<String, String>,
	/// Android hints.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub android: Option<AndroidConfig>,
	/// APNs hints.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub apns: Option<ApnsConfig>,
}
impl NotificationRequest {
	/// Creates a request with no data and no platform hints.
	pub fn new(token: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
		Self {
			token: token.into(),
			notification: Notification::new(title, body),
			data: BTreeMap::new(),
			android: None,
			apns: None,
		}
	}

	/// Adds one data entry.
	pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.data.insert(key.into(), value.into());

		self
	}

	/// Sets the Android delivery priority.
	pub fn with_android_priority(mut self, priority: AndroidPriority) -> Self {
		self.android.get_or_insert_with(Default::default).priority = Some(priority);

		self
	}

	/// Sets the Android notification channel.
	pub fn with_android_channel(mut self, channel_id: impl Into<String>) -> Self {
		self.android
			.get_or_insert_with(Default::default)
			.notification
			.get_or_insert_with(Default::default)
			.channel_id = Some(channel_id.into());

		self
	}

	/// Sets the APNs sound.
	pub fn with_apns_sound(mut self, sound: impl Into<String>) -> Self {
		self.aps_mut().sound = Some(sound.into());

		self
	}

	/// Sets the APNs badge count.
	pub fn with_apns_badge(mut self, badge: u32) -> Self {
		self.aps_mut().badge = Some(badge);

		self
	}

	/// Checks the request shape; runs before any network access.
	pub fn validate(&self) -> Result<(), InvalidRequestError> {
		if self.token.trim().is_empty() {
			return Err(InvalidRequestError::EmptyDeviceToken);
		}

		Ok(())
	}

	/// Wraps the request in the provider's `{"message": ...}` envelope.
	pub fn envelope(&self) -> MessageEnvelope<'_> {
		MessageEnvelope { message: self }
	}

	fn aps_mut(&mut self) -> &mut Aps {
		self.apns
			.get_or_insert_with(Default::default)
			.payload
			.get_or_insert_with(Default::default)
			.aps
			.get_or_insert_with(Default::default)
	}
}

/// Wire body of a send call.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct MessageEnvelope<'a> {
	/// The wrapped request.
	pub message: &'a NotificationRequest,
}
