//! Builder for [`Client`] values.

// self
#[cfg(feature = "reqwest")] use crate::client::HttpConfigHook;
use crate::{
	_prelude::*,
	client::{Client, ClientCore, OnGrant},
	environment::{Endpoints, Environment},
	error::{ArgumentError, ConfigError},
	http::HttpTransport,
	token::{Token, TokenFields, TokenParts, TokenSecret},
};

/// Collects credentials, environment, callbacks, and transport before producing a
/// [`Client`].
///
/// Validation is deferred to [`ClientBuilder::build`], so chained calls never fail midway.
pub struct ClientBuilder {
	id: Option<String>,
	secret: Option<String>,
	environment: Result<Environment, ConfigError>,
	endpoints: Option<Endpoints>,
	on_grant: Option<OnGrant>,
	#[cfg(feature = "reqwest")]
	configure_http: Option<HttpConfigHook>,
	transport: Option<Arc<dyn HttpTransport>>,
	token: Option<Result<TokenParts, ArgumentError>>,
}
impl ClientBuilder {
	/// Sets the application key.
	pub fn id(mut self, id: impl Into<String>) -> Self {
		self.id = Some(id.into());

		self
	}

	/// Sets the application secret.
	pub fn secret(mut self, secret: impl Into<String>) -> Self {
		self.secret = Some(secret.into());

		self
	}

	/// Selects the environment; defaults to [`Environment::Production`].
	pub fn environment(mut self, environment: Environment) -> Self {
		self.environment = Ok(environment);

		self
	}

	/// Selects the environment by name, e.g. from configuration.
	///
	/// Unknown names surface as [`ConfigError::InvalidEnvironment`] from
	/// [`ClientBuilder::build`].
	pub fn environment_name(mut self, name: &str) -> Self {
		self.environment = name.parse();

		self
	}

	/// Overrides the environment's URLs, e.g. to route through a proxy or a mock server.
	pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
		self.endpoints = Some(endpoints);

		self
	}

	/// Registers a callback invoked with every newly issued token.
	pub fn on_grant<F>(mut self, on_grant: F) -> Self
	where
		F: 'static + Fn(&Token) + Send + Sync,
	{
		self.on_grant = Some(Arc::new(on_grant));

		self
	}

	/// Customizes the default reqwest builder; applied once when the transport is created.
	#[cfg(feature = "reqwest")]
	pub fn configure_http<F>(mut self, configure: F) -> Self
	where
		F: 'static + Fn(reqwest::ClientBuilder) -> reqwest::ClientBuilder + Send + Sync,
	{
		self.configure_http = Some(Box::new(configure));

		self
	}

	/// Supplies the transport instead of the default reqwest client.
	pub fn http_transport<T>(self, transport: T) -> Self
	where
		T: HttpTransport,
	{
		self.http_transport_shared(Arc::new(transport))
	}

	/// Supplies a transport that is shared with other clients.
	pub fn http_transport_shared(mut self, transport: Arc<dyn HttpTransport>) -> Self {
		self.transport = Some(transport);

		self
	}

	/// Seeds the token cache, e.g. with a token persisted by the caller.
	pub fn token<F>(mut self, fields: &F) -> Self
	where
		F: ?Sized + TokenFields,
	{
		self.token = Some(TokenParts::from_fields(fields, OffsetDateTime::now_utc()));

		self
	}

	/// Validates the configuration and builds the client.
	pub fn build(self) -> Result<Client> {
		let id = required(self.id, "id")?;
		let secret = required(self.secret, "secret")?;
		let environment = self.environment?;
		let endpoints = self.endpoints.unwrap_or_else(|| environment.endpoints());
		let seed = self.token.transpose()?;
		let core = Arc::new(ClientCore {
			id,
			secret: TokenSecret::new(secret),
			environment,
			endpoints,
			on_grant: self.on_grant,
			#[cfg(feature = "reqwest")]
			configure_http: self.configure_http,
			transport: Mutex::new(self.transport),
			refresh_guards: Default::default(),
		});
		let cache = Arc::new_cyclic(|cache| {
			AsyncMutex::new(seed.map(|parts| parts.bind(Arc::clone(&core), cache.clone())))
		});

		Ok(Client::from_parts(core, cache))
	}
}
impl Default for ClientBuilder {
	fn default() -> Self {
		Self {
			id: None,
			secret: None,
			environment: Ok(Environment::default()),
			endpoints: None,
			on_grant: None,
			#[cfg(feature = "reqwest")]
			configure_http: None,
			transport: None,
			token: None,
		}
	}
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ConfigError> {
	value.filter(|value| !value.is_empty()).ok_or(ConfigError::MissingField { field })
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[test]
	fn environment_selects_the_url_triple() {
		let client = Client::builder()
			.id("id")
			.secret("secret")
			.environment_name("sandbox")
			.build()
			.expect("Sandbox client should build.");

		assert_eq!(client.environment(), Environment::Sandbox);
		assert_eq!(client.endpoints().api_url, "https://api-sandbox.dwolla.com");

		let client = Client::new("id", "secret").expect("Production client should build.");

		assert_eq!(client.endpoints(), &Environment::Production.endpoints());
	}

	#[test]
	fn unknown_environment_fails_at_build() {
		let err = Client::builder()
			.id("id")
			.secret("secret")
			.environment_name("moon")
			.build()
			.expect_err("Unknown environments should fail.");

		assert!(matches!(err, Error::Config(ConfigError::InvalidEnvironment { .. })));
	}

	#[test]
	fn endpoint_override_wins_over_environment() {
		let client = Client::builder()
			.id("id")
			.secret("secret")
			.environment(Environment::Sandbox)
			.endpoints(Endpoints::new(
				"http://localhost/auth",
				"http://localhost/token",
				"http://localhost",
			))
			.build()
			.expect("Overridden client should build.");

		assert_eq!(client.endpoints().token_url, "http://localhost/token");
		assert_eq!(client.environment(), Environment::Sandbox);
	}

	#[tokio::test]
	async fn seeded_token_fills_the_cache() {
		let client = Client::builder()
			.id("id")
			.secret("secret")
			.token(&json!({ "access_token": "seeded", "refresh_token": "r" }))
			.build()
			.expect("Seeded client should build.");
		let token = client.current_token().await.expect("Seeded token should be served.");

		assert_eq!(token.access_token(), "seeded");
		assert!(token.client().is_some());
	}

	#[test]
	fn seed_without_access_token_fails_at_build() {
		let err = Client::builder()
			.id("id")
			.secret("secret")
			.token(&json!({ "refresh_token": "r" }))
			.build()
			.expect_err("Seeds need an access token.");

		assert!(matches!(err, Error::Argument(ArgumentError::Missing { name: "access_token" })));
	}
}
