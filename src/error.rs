//! Client-level error types shared across token exchanges, API requests, and configuration.

// std
use std::convert::Infallible;
// self
use crate::{_prelude::*, classify::ApiError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem detected at construction time.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// A call received unusable arguments.
	#[error(transparent)]
	Argument(#[from] ArgumentError),
	/// The API or token endpoint answered with a classified failure.
	#[error(transparent)]
	Api(#[from] ApiError),
	/// Temporary upstream failure; retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
}
impl Error {
	/// Returns the classified API failure, if this error carries one.
	pub fn api(&self) -> Option<&ApiError> {
		match self {
			Self::Api(err) => Some(err),
			_ => None,
		}
	}
}
impl From<Infallible> for Error {
	fn from(never: Infallible) -> Self {
		match never {}
	}
}

/// Configuration and validation failures raised while building clients or requests.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// A required client field was not supplied.
	#[error(":{field} is required")]
	MissingField {
		/// Name of the missing field.
		field: &'static str,
	},
	/// Environment name does not match a known URL set.
	#[error("invalid environment `{value}`; expected `production` or `sandbox`")]
	InvalidEnvironment {
		/// Rejected environment name.
		value: String,
	},
	/// A request URL could not be assembled.
	#[error("URL `{url}` is invalid.")]
	InvalidUrl {
		/// The rejected URL text.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// No HTTP transport is configured and the `reqwest` feature is disabled.
	#[error("No HTTP transport is configured.")]
	MissingTransport,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Invalid arguments passed to grant helpers or request builders.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ArgumentError {
	/// A required grant parameter was not supplied.
	#[error(":{name} is required")]
	Missing {
		/// Name of the missing parameter.
		name: &'static str,
	},
	/// The `state` returned to the redirect handler differs from the one that was sent.
	#[error("Authorization state mismatch.")]
	StateMismatch,
	/// A resource value was used as a path but carries no `_links.self.href`.
	#[error("Resource has no `_links.self.href` to request.")]
	MissingSelfLink,
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Upstream returned an unexpected but non-fatal response.
	#[error("Upstream returned an unexpected response: {message}.")]
	Upstream {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// A response body could not be decoded as the expected JSON.
	#[error("Response body is malformed JSON.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling Dwolla.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling Dwolla.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
