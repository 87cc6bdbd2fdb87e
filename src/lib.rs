//! Push-notification delivery core for check-in apps: sign service-account assertions, cache the
//! resulting bearer token behind a single-flight guard, and dispatch FCM v1 messages that always
//! resolve to a uniform delivery result.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod clock;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod message;
pub mod obs;
pub mod templates;

pub use cache::TokenCache;
pub use config::{ServiceAccount, ServiceAccountKey};
pub use dispatch::{BatchSummary, DeliveryResult, Dispatcher};
pub use error::{Error, Result};
pub use message::NotificationRequest;

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
