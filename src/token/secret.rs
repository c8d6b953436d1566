//! Credential values and the `Authorization` headers built from them.

// crates.io
use base64::{Engine, prelude::BASE64_STANDARD};
use oauth2::http::{self, HeaderValue};
// self
use crate::{_prelude::*, error::ConfigError};

/// Access token, refresh token, or application secret.
///
/// Formatting prints `<redacted>`; [`TokenSecret::expose`] is the only way to read the value,
/// and the headers built here are flagged sensitive so HTTP stacks skip them when logging.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps `value`.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Raw value, for wire use only.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// `Bearer <token>` for API requests.
	pub fn bearer(&self) -> Result<HeaderValue, ConfigError> {
		sensitive(format!("Bearer {}", self.0))
	}

	/// `Basic base64(id:secret)` for the token endpoint, with `self` as the secret.
	pub fn basic(&self, id: &str) -> Result<HeaderValue, ConfigError> {
		sensitive(format!("Basic {}", BASE64_STANDARD.encode(format!("{id}:{}", self.0))))
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl PartialEq<str> for TokenSecret {
	fn eq(&self, other: &str) -> bool {
		self.0 == other
	}
}
impl PartialEq<&str> for TokenSecret {
	fn eq(&self, other: &&str) -> bool {
		self.0 == *other
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("TokenSecret(<redacted>)")
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

fn sensitive(value: String) -> Result<HeaderValue, ConfigError> {
	let mut value = HeaderValue::try_from(value).map_err(http::Error::from)?;

	value.set_sensitive(true);

	Ok(value)
}
