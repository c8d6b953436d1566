//! Dwolla environments and the URL triple each one resolves to.

// self
use crate::{_prelude::*, error::ConfigError};

/// Deployment targeted by a [`Client`](crate::client::Client).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
	/// Live environment.
	#[default]
	Production,
	/// Sandbox environment for integration testing.
	Sandbox,
}
impl Environment {
	/// Every known environment.
	pub const ALL: [Self; 2] = [Self::Production, Self::Sandbox];

	/// Returns the configuration name of the environment.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Production => "production",
			Self::Sandbox => "sandbox",
		}
	}

	/// Returns the fixed URL triple of the environment.
	pub const fn endpoints(self) -> Endpoints {
		match self {
			Self::Production => Endpoints {
				auth_url: Cow::Borrowed("https://accounts.dwolla.com/auth"),
				token_url: Cow::Borrowed("https://api.dwolla.com/token"),
				api_url: Cow::Borrowed("https://api.dwolla.com"),
			},
			Self::Sandbox => Endpoints {
				auth_url: Cow::Borrowed("https://accounts-sandbox.dwolla.com/auth"),
				token_url: Cow::Borrowed("https://api-sandbox.dwolla.com/token"),
				api_url: Cow::Borrowed("https://api-sandbox.dwolla.com"),
			},
		}
	}

	/// Resolves an environment name into its URL triple.
	pub fn resolve(name: &str) -> Result<Endpoints, ConfigError> {
		name.parse::<Self>().map(Self::endpoints)
	}
}
impl Display for Environment {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Environment {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|env| env.as_str() == s)
			.ok_or_else(|| ConfigError::InvalidEnvironment { value: s.to_owned() })
	}
}

/// Authorization, token, and API base URLs used by a client.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoints {
	/// Authorization page for the authorization-code grant.
	pub auth_url: Cow<'static, str>,
	/// Token endpoint for every grant.
	pub token_url: Cow<'static, str>,
	/// Base URL that relative API paths are joined to.
	pub api_url: Cow<'static, str>,
}
impl Endpoints {
	/// Creates a custom URL triple, e.g. for a proxy or a local mock server.
	pub fn new(
		auth_url: impl Into<Cow<'static, str>>,
		token_url: impl Into<Cow<'static, str>>,
		api_url: impl Into<Cow<'static, str>>,
	) -> Self {
		Self { auth_url: auth_url.into(), token_url: token_url.into(), api_url: api_url.into() }
	}
}
impl From<Environment> for Endpoints {
	fn from(env: Environment) -> Self {
		env.endpoints()
	}
}
