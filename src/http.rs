//! Transport seam for token exchanges and API requests.
//!
//! Every request the crate performs goes through one [`HttpTransport`] per client. The
//! default [`ReqwestHttpClient`] is created lazily on first use; callers that need a
//! different stack (or a test double) implement the trait and hand it to
//! [`ClientBuilder::http_transport`](crate::client::ClientBuilder::http_transport).

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
pub use oauth2::{HttpRequest, HttpResponse};
// self
use crate::_prelude::*;
#[cfg(feature = "reqwest")] use crate::error::{ConfigError, TransientError, TransportError};

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<HttpResponse>> + 'a + Send>>;

/// Object-safe HTTP transport shared by a client and every token it issues.
///
/// Implementations must not follow redirects: the token endpoint answers directly and
/// `201 Created` responses carry the new resource in `Location`.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and resolves with the raw response, whatever its status.
	///
	/// Only failures to obtain a response (DNS, TCP, TLS, timeouts) are errors here;
	/// non-2xx statuses are classified by the caller.
	fn send(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds the default transport after passing the builder through `configure`.
	pub fn configured(
		configure: impl FnOnce(reqwest::ClientBuilder) -> reqwest::ClientBuilder,
	) -> Result<Self, ConfigError> {
		let builder = ReqwestClient::builder().redirect(reqwest::redirect::Policy::none());

		Ok(Self(configure(builder).build()?))
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
impl HttpTransport for ReqwestHttpClient {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let request = reqwest::Request::try_from(request).map_err(map_reqwest_error)?;
			let response = self.0.execute(request).await.map_err(map_reqwest_error)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(map_reqwest_error)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// Maps reqwest failures onto the crate taxonomy.
#[cfg(feature = "reqwest")]
pub fn map_reqwest_error(err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransientError::Upstream {
			message: format!("request timed out: {err}"),
			status: err.status().map(|status| status.as_u16()),
		}
		.into();
	}

	TransportError::from(err).into()
}
