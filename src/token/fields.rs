//! Capability trait for anything that can describe a token.

// crates.io
use time::format_description::well_known::Rfc3339;
// self
use crate::_prelude::*;

/// Source of token fields: a token-endpoint response, a JSON object, a string map, or a
/// caller type.
///
/// Only [`access_token`](TokenFields::access_token) is required; every other field
/// defaults to `None`. Implementations ignore keys they do not recognize.
pub trait TokenFields {
	/// Bearer credential.
	fn access_token(&self) -> Option<String>;

	/// Credential used to obtain a new access token.
	fn refresh_token(&self) -> Option<String> {
		None
	}

	/// Access-token lifetime in seconds, relative to issuance.
	fn expires_in(&self) -> Option<i64> {
		None
	}

	/// Absolute access-token expiry; wins over [`expires_in`](TokenFields::expires_in).
	fn expires_at(&self) -> Option<OffsetDateTime> {
		None
	}

	/// Refresh-token lifetime in seconds, relative to issuance.
	fn refresh_expires_in(&self) -> Option<i64> {
		None
	}

	/// Absolute refresh-token expiry.
	fn refresh_expires_at(&self) -> Option<OffsetDateTime> {
		None
	}

	/// Space-delimited granted scopes.
	fn scope(&self) -> Option<String> {
		None
	}

	/// Application the token was issued to.
	fn app_id(&self) -> Option<String> {
		None
	}

	/// Account the token acts on behalf of.
	fn account_id(&self) -> Option<String> {
		None
	}
}

impl TokenFields for Map<String, Value> {
	fn access_token(&self) -> Option<String> {
		json_string(self.get("access_token")?)
	}

	fn refresh_token(&self) -> Option<String> {
		json_string(self.get("refresh_token")?)
	}

	fn expires_in(&self) -> Option<i64> {
		json_seconds(self.get("expires_in")?)
	}

	fn expires_at(&self) -> Option<OffsetDateTime> {
		json_instant(self.get("expires_at")?)
	}

	fn refresh_expires_in(&self) -> Option<i64> {
		json_seconds(self.get("refresh_expires_in")?)
	}

	fn refresh_expires_at(&self) -> Option<OffsetDateTime> {
		json_instant(self.get("refresh_expires_at")?)
	}

	fn scope(&self) -> Option<String> {
		json_string(self.get("scope")?)
	}

	fn app_id(&self) -> Option<String> {
		json_string(self.get("app_id")?)
	}

	fn account_id(&self) -> Option<String> {
		json_string(self.get("account_id")?)
	}
}

impl TokenFields for Value {
	fn access_token(&self) -> Option<String> {
		self.as_object()?.access_token()
	}

	fn refresh_token(&self) -> Option<String> {
		self.as_object()?.refresh_token()
	}

	fn expires_in(&self) -> Option<i64> {
		self.as_object()?.expires_in()
	}

	fn expires_at(&self) -> Option<OffsetDateTime> {
		self.as_object()?.expires_at()
	}

	fn refresh_expires_in(&self) -> Option<i64> {
		self.as_object()?.refresh_expires_in()
	}

	fn refresh_expires_at(&self) -> Option<OffsetDateTime> {
		self.as_object()?.refresh_expires_at()
	}

	fn scope(&self) -> Option<String> {
		self.as_object()?.scope()
	}

	fn app_id(&self) -> Option<String> {
		self.as_object()?.app_id()
	}

	fn account_id(&self) -> Option<String> {
		self.as_object()?.account_id()
	}
}

macro_rules! impl_token_fields_for_string_map {
	($($map:ty),+ $(,)?) => {
		$(
			impl TokenFields for $map {
				fn access_token(&self) -> Option<String> {
					self.get("access_token").cloned()
				}

				fn refresh_token(&self) -> Option<String> {
					self.get("refresh_token").cloned()
				}

				fn expires_in(&self) -> Option<i64> {
					self.get("expires_in")?.trim().parse().ok()
				}

				fn expires_at(&self) -> Option<OffsetDateTime> {
					text_instant(self.get("expires_at")?)
				}

				fn refresh_expires_in(&self) -> Option<i64> {
					self.get("refresh_expires_in")?.trim().parse().ok()
				}

				fn refresh_expires_at(&self) -> Option<OffsetDateTime> {
					text_instant(self.get("refresh_expires_at")?)
				}

				fn scope(&self) -> Option<String> {
					self.get("scope").cloned()
				}

				fn app_id(&self) -> Option<String> {
					self.get("app_id").cloned()
				}

				fn account_id(&self) -> Option<String> {
					self.get("account_id").cloned()
				}
			}
		)+
	};
}
impl_token_fields_for_string_map!(BTreeMap<String, String>, HashMap<String, String>);

fn json_string(value: &Value) -> Option<String> {
	match value {
		Value::String(s) => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		_ => None,
	}
}

fn json_seconds(value: &Value) -> Option<i64> {
	match value {
		Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
		Value::String(s) => s.trim().parse().ok(),
		_ => None,
	}
}

fn json_instant(value: &Value) -> Option<OffsetDateTime> {
	match value {
		Value::String(s) => text_instant(s),
		Value::Number(n) => OffsetDateTime::from_unix_timestamp(n.as_i64()?).ok(),
		_ => None,
	}
}

/// Parses an RFC 3339 timestamp or unix seconds.
fn text_instant(raw: &str) -> Option<OffsetDateTime> {
	let raw = raw.trim();

	OffsetDateTime::parse(raw, &Rfc3339)
		.ok()
		.or_else(|| OffsetDateTime::from_unix_timestamp(raw.parse().ok()?).ok())
}
