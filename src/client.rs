//! Dwolla API client: credentials, endpoints, a shared transport, and the cached
//! client-credentials token.
//!
//! ```no_run
//! use dwolla_v2::{Client, Environment};
//!
//! # async fn run() -> dwolla_v2::Result<()> {
//! let client = Client::builder()
//! 	.id("app-key")
//! 	.secret("app-secret")
//! 	.environment(Environment::Sandbox)
//! 	.build()?;
//! let root = client.get("/").await?;
//!
//! println!("{:?}", root.body());
//! # Ok(())
//! # }
//! ```

mod builder;
mod exchange;

pub use builder::*;
pub use exchange::*;

// self
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;
use crate::{
	_prelude::*,
	auth::{Auth, AuthParams},
	environment::{Endpoints, Environment},
	error::ArgumentError,
	http::{HttpRequest, HttpResponse, HttpTransport},
	request::{ApiPath, ApiRequest, ApiResponse},
	token::{Token, TokenFields, TokenParts, TokenSecret},
};

/// Callback invoked with every newly issued token.
pub type OnGrant = Arc<dyn Fn(&Token) + Send + Sync>;
/// Hook that customizes the default reqwest builder before the transport is created.
#[cfg(feature = "reqwest")]
pub type HttpConfigHook =
	Box<dyn Fn(reqwest::ClientBuilder) -> reqwest::ClientBuilder + Send + Sync>;

pub(crate) type TokenCache = AsyncMutex<Option<Token>>;
/// Singleflight slot for one refresh token; holds the exchange result once settled.
pub(crate) type RefreshGuard = Arc<AsyncMutex<Option<TokenParts>>>;

/// Immutable client state shared by the client, its clones, and every token it issues.
pub(crate) struct ClientCore {
	pub(crate) id: String,
	pub(crate) secret: TokenSecret,
	pub(crate) environment: Environment,
	pub(crate) endpoints: Endpoints,
	on_grant: Option<OnGrant>,
	#[cfg(feature = "reqwest")]
	configure_http: Option<HttpConfigHook>,
	transport: Mutex<Option<Arc<dyn HttpTransport>>>,
	refresh_guards: Mutex<HashMap<String, RefreshGuard>>,
}
impl ClientCore {
	/// Returns the shared transport, creating the default one on first use.
	pub(crate) fn transport(&self) -> Result<Arc<dyn HttpTransport>> {
		let mut slot = self.transport.lock();

		if let Some(transport) = slot.as_ref() {
			return Ok(Arc::clone(transport));
		}

		let transport = self.default_transport()?;

		*slot = Some(Arc::clone(&transport));

		Ok(transport)
	}

	#[cfg(feature = "reqwest")]
	fn default_transport(&self) -> Result<Arc<dyn HttpTransport>> {
		let client = ReqwestHttpClient::configured(|builder| match &self.configure_http {
			Some(configure) => configure(builder),
			None => builder,
		})?;

		Ok(Arc::new(client))
	}

	#[cfg(not(feature = "reqwest"))]
	fn default_transport(&self) -> Result<Arc<dyn HttpTransport>> {
		Err(crate::error::ConfigError::MissingTransport.into())
	}

	pub(crate) async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
		let transport = self.transport()?;

		transport.send(request).await
	}

	/// Returns the singleflight slot for exchanges of `refresh_token`.
	pub(crate) fn refresh_guard(&self, refresh_token: &TokenSecret) -> RefreshGuard {
		Arc::clone(self.refresh_guards.lock().entry(refresh_token.expose().to_owned()).or_default())
	}

	/// Forgets settled slots whose result was itself refreshed with `spent`.
	///
	/// One settled slot per token lineage survives, so late callers holding the previous
	/// refresh token still find its result.
	pub(crate) fn prune_refresh_guards(&self, spent: &TokenSecret) {
		self.refresh_guards.lock().retain(|_, guard| {
			guard.try_lock().is_none_or(|settled| match &*settled {
				Some(parts) => parts.refresh_token().is_none_or(|next| next != spent),
				None => true,
			})
		});
	}

	pub(crate) fn notify(&self, token: &Token) {
		if let Some(on_grant) = &self.on_grant {
			on_grant(token);
		}
	}
}

/// Cheaply cloneable handle to one Dwolla application.
///
/// Clones share credentials, the transport, and the cached client-credentials token.
#[derive(Clone)]
pub struct Client {
	core: Arc<ClientCore>,
	cache: Arc<TokenCache>,
}
impl Client {
	/// Starts building a client.
	pub fn builder() -> ClientBuilder {
		ClientBuilder::default()
	}

	/// Builds a production client from an application key and secret.
	pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Result<Self> {
		Self::builder().id(id).secret(secret).build()
	}

	pub(crate) fn from_parts(core: Arc<ClientCore>, cache: Arc<TokenCache>) -> Self {
		Self { core, cache }
	}

	/// Application key.
	pub fn id(&self) -> &str {
		&self.core.id
	}

	/// Environment the client was built for.
	pub fn environment(&self) -> Environment {
		self.core.environment
	}

	/// URLs in use, including any override.
	pub fn endpoints(&self) -> &Endpoints {
		&self.core.endpoints
	}

	/// Returns the cached client-credentials token, exchanging a new one when the cache is
	/// empty or the cached token has expired.
	///
	/// Concurrent callers observing a miss wait for a single exchange and share its token.
	pub async fn current_token(&self) -> Result<Token> {
		let mut slot = self.cache.lock().await;

		if let Some(token) = slot.as_ref().filter(|token| !token.is_expired()) {
			return Ok(token.clone());
		}

		let token = self.exchange(GrantType::ClientCredentials, GrantParams::new()).await?;

		*slot = Some(token.clone());

		Ok(token)
	}

	/// Peeks at the cached token without exchanging.
	pub async fn cached_token(&self) -> Option<Token> {
		self.cache.lock().await.clone()
	}

	/// Drops the cached token so the next call exchanges a new one.
	pub async fn clear_current_token(&self) {
		self.cache.lock().await.take();
	}

	/// Starts an authorization-code flow.
	pub fn auth(&self, params: AuthParams) -> Auth {
		Auth::new(self.clone(), params)
	}

	/// Wraps an existing access token without any network call.
	pub fn token<F>(&self, fields: &F) -> Result<Token>
	where
		F: ?Sized + TokenFields,
	{
		self.token_at(fields, OffsetDateTime::now_utc())
	}

	/// Same as [`Client::token`], deriving relative expiries from `issued_at`.
	pub fn token_at<F>(&self, fields: &F, issued_at: OffsetDateTime) -> Result<Token>
	where
		F: ?Sized + TokenFields,
	{
		Ok(self.bind(TokenParts::from_fields(fields, issued_at)?))
	}

	/// Exchanges the `refresh_token` in `params` for a new token.
	///
	/// Other parameters are forwarded to the token endpoint unchanged.
	pub async fn refresh_token(&self, params: GrantParams) -> Result<Token> {
		if params.get("refresh_token").is_none_or(|token| token.is_empty()) {
			return Err(ArgumentError::Missing { name: "refresh_token" }.into());
		}

		self.exchange(GrantType::RefreshToken, params).await
	}

	/// Exchanges the refresh token carried by `token`.
	pub async fn refresh(&self, token: &Token) -> Result<Token> {
		self.core.refresh(&Arc::downgrade(&self.cache), token).await
	}

	/// Performs a token-endpoint exchange for an arbitrary grant.
	pub async fn exchange(&self, grant: GrantType, params: GrantParams) -> Result<Token> {
		self.core.exchange(&Arc::downgrade(&self.cache), &grant, &params).await
	}

	/// `GET path` with the current token.
	///
	/// Custom headers go through [`Client::execute`] and [`ApiRequest::header`].
	pub async fn get<P>(&self, path: P) -> Result<ApiResponse>
	where
		P: TryInto<ApiPath>,
		Error: From<P::Error>,
	{
		self.current_token().await?.get(path).await
	}

	/// `POST path` with the current token.
	///
	/// Custom headers go through [`Client::execute`] and [`ApiRequest::header`].
	pub async fn post<P>(&self, path: P, body: impl Into<Option<Value>>) -> Result<ApiResponse>
	where
		P: TryInto<ApiPath>,
		Error: From<P::Error>,
	{
		self.current_token().await?.post(path, body).await
	}

	/// `PUT path` with the current token.
	///
	/// Custom headers go through [`Client::execute`] and [`ApiRequest::header`].
	pub async fn put<P>(&self, path: P, body: impl Into<Option<Value>>) -> Result<ApiResponse>
	where
		P: TryInto<ApiPath>,
		Error: From<P::Error>,
	{
		self.current_token().await?.put(path, body).await
	}

	/// `PATCH path` with the current token.
	///
	/// Custom headers go through [`Client::execute`] and [`ApiRequest::header`].
	pub async fn patch<P>(&self, path: P, body: impl Into<Option<Value>>) -> Result<ApiResponse>
	where
		P: TryInto<ApiPath>,
		Error: From<P::Error>,
	{
		self.current_token().await?.patch(path, body).await
	}

	/// `DELETE path` with the current token.
	///
	/// Custom headers go through [`Client::execute`] and [`ApiRequest::header`].
	pub async fn delete<P>(&self, path: P) -> Result<ApiResponse>
	where
		P: TryInto<ApiPath>,
		Error: From<P::Error>,
	{
		self.current_token().await?.delete(path).await
	}

	/// Sends `request` with the current token.
	pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
		self.current_token().await?.execute(request).await
	}

	fn bind(&self, parts: TokenParts) -> Token {
		parts.bind(Arc::clone(&self.core), Arc::downgrade(&self.cache))
	}
}
impl Debug for Client {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Client")
			.field("id", &self.core.id)
			.field("secret", &self.core.secret)
			.field("environment", &self.core.environment)
			.field("endpoints", &self.core.endpoints)
			.finish_non_exhaustive()
	}
}
