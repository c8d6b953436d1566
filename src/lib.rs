//! Dwolla v2 API client core: OAuth 2.0 client-credentials and authorization-code grants,
//! self-refreshing bearer tokens, and a typed taxonomy for every API failure.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod classify;
pub mod client;
pub mod environment;
pub mod error;
pub mod http;
pub mod obs;
pub mod request;
pub mod token;

mod _prelude {
	pub use std::{
		borrow::Cow,
		collections::{BTreeMap, HashMap},
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::{Arc, Weak},
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::{Map, Value};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use crate::{
	auth::{Auth, AuthParams},
	classify::{ApiError, ApiErrorKind},
	client::{Client, ClientBuilder, GrantParams, GrantType},
	environment::{Endpoints, Environment},
	error::{Error, Result},
	request::{ApiPath, ApiRequest, ApiResponse},
	token::{Token, TokenFields},
};

pub use oauth2::http as http_types;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
