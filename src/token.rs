//! Bearer tokens bound to a client.
//!
//! A [`Token`] carries the credential fields returned by the token endpoint together with a
//! shared handle to its client's immutable core (credentials, endpoints, transport). Every
//! HTTP verb goes through [`Token::execute`], which refreshes the token and retries once
//! when the API reports `ExpiredAccessToken` and a refresh token is available.

mod fields;
mod secret;

pub use fields::*;
pub use secret::*;

// crates.io
use futures::future;
use oauth2::http::Method;
use time::format_description::well_known::Rfc3339;
// self
use crate::{
	_prelude::*,
	client::{Client, ClientCore, TokenCache},
	error::ArgumentError,
	obs::{self, FlowKind},
	request::{ApiPath, ApiRequest, ApiResponse},
};

/// Safety margin applied to every expiry check.
pub const LEEWAY: Duration = Duration::seconds(60);

/// Credential fields resolved at issuance, before the token is bound to a client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TokenParts {
	access_token: TokenSecret,
	refresh_token: Option<TokenSecret>,
	expires_in: Option<i64>,
	expires_at: Option<OffsetDateTime>,
	refresh_expires_in: Option<i64>,
	refresh_expires_at: Option<OffsetDateTime>,
	scope: Option<String>,
	app_id: Option<String>,
	account_id: Option<String>,
}
impl TokenParts {
	/// Reads `fields` and derives absolute expiries relative to `issued_at`.
	pub(crate) fn from_fields<F>(
		fields: &F,
		issued_at: OffsetDateTime,
	) -> Result<Self, ArgumentError>
	where
		F: ?Sized + TokenFields,
	{
		let access_token = fields
			.access_token()
			.filter(|token| !token.is_empty())
			.ok_or(ArgumentError::Missing { name: "access_token" })?;
		let expires_in = fields.expires_in();
		let refresh_expires_in = fields.refresh_expires_in();

		Ok(Self {
			access_token: TokenSecret::new(access_token),
			refresh_token: fields
				.refresh_token()
				.filter(|token| !token.is_empty())
				.map(TokenSecret::new),
			expires_in,
			expires_at: fields.expires_at().or_else(|| derive_expiry(issued_at, expires_in)),
			refresh_expires_in,
			refresh_expires_at: fields
				.refresh_expires_at()
				.or_else(|| derive_expiry(issued_at, refresh_expires_in)),
			scope: fields.scope(),
			app_id: fields.app_id(),
			account_id: fields.account_id(),
		})
	}

	pub(crate) fn refresh_token(&self) -> Option<&TokenSecret> {
		self.refresh_token.as_ref()
	}

	pub(crate) fn bind(self, core: Arc<ClientCore>, cache: Weak<TokenCache>) -> Token {
		Token { parts: self, core, cache }
	}
}

fn derive_expiry(issued_at: OffsetDateTime, seconds: Option<i64>) -> Option<OffsetDateTime> {
	issued_at.checked_add(Duration::seconds(seconds?))
}

/// Bearer credential that performs authenticated API calls.
///
/// Tokens are immutable: refreshing produces a new instance. Cloning is cheap and every
/// clone shares the client's transport.
#[derive(Clone)]
pub struct Token {
	parts: TokenParts,
	core: Arc<ClientCore>,
	cache: Weak<TokenCache>,
}
impl Token {
	/// Bearer credential.
	pub fn access_token(&self) -> &TokenSecret {
		&self.parts.access_token
	}

	/// Refresh credential, when the grant issued one.
	pub fn refresh_token(&self) -> Option<&TokenSecret> {
		self.parts.refresh_token.as_ref()
	}

	/// Access-token lifetime in seconds as reported at issuance.
	pub fn expires_in(&self) -> Option<i64> {
		self.parts.expires_in
	}

	/// Absolute access-token expiry.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.parts.expires_at
	}

	/// Refresh-token lifetime in seconds as reported at issuance.
	pub fn refresh_expires_in(&self) -> Option<i64> {
		self.parts.refresh_expires_in
	}

	/// Absolute refresh-token expiry.
	pub fn refresh_expires_at(&self) -> Option<OffsetDateTime> {
		self.parts.refresh_expires_at
	}

	/// Granted scopes.
	pub fn scope(&self) -> Option<&str> {
		self.parts.scope.as_deref()
	}

	/// Application identifier.
	pub fn app_id(&self) -> Option<&str> {
		self.parts.app_id.as_deref()
	}

	/// Account identifier.
	pub fn account_id(&self) -> Option<&str> {
		self.parts.account_id.as_deref()
	}

	/// Returns `true` once the access token is within [`LEEWAY`] of its expiry.
	///
	/// Tokens without an expiry never expire.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}

	/// Same as [`Token::is_expired`] against an explicit clock.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		self.parts.expires_at.is_some_and(|at| now + LEEWAY >= at)
	}

	/// Returns `true` once the refresh token is within [`LEEWAY`] of its expiry.
	pub fn is_refresh_expired(&self) -> bool {
		self.is_refresh_expired_at(OffsetDateTime::now_utc())
	}

	/// Same as [`Token::is_refresh_expired`] against an explicit clock.
	pub fn is_refresh_expired_at(&self, now: OffsetDateTime) -> bool {
		self.parts.refresh_expires_at.is_some_and(|at| now + LEEWAY >= at)
	}

	/// Returns the client that issued this token while that client is still alive.
	pub fn client(&self) -> Option<Client> {
		Some(Client::from_parts(Arc::clone(&self.core), self.cache.upgrade()?))
	}

	/// Looks up a single field by its wire name.
	pub fn field(&self, name: &str) -> Option<Value> {
		self.to_map().remove(name)
	}

	/// String-keyed projection of the set fields; timestamps are RFC 3339.
	pub fn to_map(&self) -> Map<String, Value> {
		let parts = &self.parts;
		let mut map = Map::new();
		let mut put = |key: &str, value: Option<Value>| {
			if let Some(value) = value {
				map.insert(key.to_owned(), value);
			}
		};

		put("access_token", Some(parts.access_token.expose().into()));
		put("refresh_token", parts.refresh_token.as_ref().map(|token| token.expose().into()));
		put("expires_in", parts.expires_in.map(Value::from));
		put("expires_at", parts.expires_at.and_then(rfc3339));
		put("refresh_expires_in", parts.refresh_expires_in.map(Value::from));
		put("refresh_expires_at", parts.refresh_expires_at.and_then(rfc3339));
		put("scope", parts.scope.clone().map(Value::from));
		put("app_id", parts.app_id.clone().map(Value::from));
		put("account_id", parts.account_id.clone().map(Value::from));

		map
	}

	/// Projection without the fields matching `predicate`.
	pub fn reject<P>(&self, mut predicate: P) -> Map<String, Value>
	where
		P: FnMut(&str, &Value) -> bool,
	{
		self.to_map().into_iter().filter(|(key, value)| !predicate(key.as_str(), value)).collect()
	}

	/// Returns `true` when no field is set.
	pub fn is_empty(&self) -> bool {
		self.to_map().is_empty()
	}

	/// `GET path`.
	///
	/// Custom headers go through [`Token::execute`] and [`ApiRequest::header`].
	pub async fn get<P>(&self, path: P) -> Result<ApiResponse>
	where
		P: TryInto<ApiPath>,
		Error: From<P::Error>,
	{
		self.execute(ApiRequest::new(Method::GET, path.try_into()?)).await
	}

	/// `POST path` with an optional JSON body.
	///
	/// Custom headers go through [`Token::execute`] and [`ApiRequest::header`].
	pub async fn post<P>(&self, path: P, body: impl Into<Option<Value>>) -> Result<ApiResponse>
	where
		P: TryInto<ApiPath>,
		Error: From<P::Error>,
	{
		self.execute(ApiRequest::new(Method::POST, path.try_into()?).body(body)).await
	}

	/// `PUT path` with an optional JSON body.
	///
	/// Custom headers go through [`Token::execute`] and [`ApiRequest::header`].
	pub async fn put<P>(&self, path: P, body: impl Into<Option<Value>>) -> Result<ApiResponse>
	where
		P: TryInto<ApiPath>,
		Error: From<P::Error>,
	{
		self.execute(ApiRequest::new(Method::PUT, path.try_into()?).body(body)).await
	}

	/// `PATCH path` with an optional JSON body.
	///
	/// Custom headers go through [`Token::execute`] and [`ApiRequest::header`].
	pub async fn patch<P>(&self, path: P, body: impl Into<Option<Value>>) -> Result<ApiResponse>
	where
		P: TryInto<ApiPath>,
		Error: From<P::Error>,
	{
		self.execute(ApiRequest::new(Method::PATCH, path.try_into()?).body(body)).await
	}

	/// `DELETE path`.
	///
	/// Custom headers go through [`Token::execute`] and [`ApiRequest::header`].
	pub async fn delete<P>(&self, path: P) -> Result<ApiResponse>
	where
		P: TryInto<ApiPath>,
		Error: From<P::Error>,
	{
		self.execute(ApiRequest::new(Method::DELETE, path.try_into()?)).await
	}

	/// Sends `request`, refreshing and retrying once on `ExpiredAccessToken`.
	pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
		obs::observe(FlowKind::ApiRequest, "execute", self.execute_with_retry(&request)).await
	}

	/// Sends every request concurrently over the shared transport.
	///
	/// Results keep the order of `requests`; each request follows the same
	/// refresh-and-retry rule as [`Token::execute`].
	pub async fn in_parallel<I>(&self, requests: I) -> Vec<Result<ApiResponse>>
	where
		I: IntoIterator<Item = ApiRequest>,
	{
		future::join_all(requests.into_iter().map(|request| self.execute(request))).await
	}

	async fn execute_with_retry(&self, request: &ApiRequest) -> Result<ApiResponse> {
		match self.dispatch(request).await {
			Err(Error::Api(err))
				if err.is_expired_access_token() && self.parts.refresh_token.is_some() =>
			{
				#[cfg(feature = "tracing")]
				tracing::debug!(
					method = %request.method(),
					path = %request.path(),
					"access token expired; refreshing and retrying once"
				);

				let fresh = self.refresh_and_rotate().await?;

				fresh.dispatch(request).await
			},
			result => result,
		}
	}

	async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse> {
		let http_request =
			request.to_http(&self.core.endpoints.api_url, &self.parts.access_token)?;
		let response = self.core.send(http_request).await?;

		ApiResponse::from_http(response)
	}

	/// Exchanges this token's refresh token once per client, however many calls hit
	/// `ExpiredAccessToken` with it.
	///
	/// Callers sharing the refresh token wait on its singleflight slot; the first one
	/// exchanges and swaps the client's cached token when it still holds this one, the rest
	/// reuse the settled result.
	async fn refresh_and_rotate(&self) -> Result<Token> {
		let refresh_token =
			self.parts.refresh_token().ok_or(ArgumentError::Missing { name: "refresh_token" })?;
		let guard = self.core.refresh_guard(refresh_token);
		let mut settled = guard.lock().await;

		if let Some(parts) = &*settled {
			return Ok(parts.clone().bind(Arc::clone(&self.core), self.cache.clone()));
		}

		let fresh = self.core.refresh(&self.cache, self).await?;

		if let Some(cache) = self.cache.upgrade() {
			let mut slot = cache.lock().await;

			if slot
				.as_ref()
				.is_some_and(|cached| cached.parts.access_token == self.parts.access_token)
			{
				*slot = Some(fresh.clone());
			}
		}

		*settled = Some(fresh.parts.clone());

		drop(settled);

		self.core.prune_refresh_guards(refresh_token);

		Ok(fresh)
	}

	#[cfg(test)]
	pub(crate) fn parts(&self) -> &TokenParts {
		&self.parts
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Token")
			.field("access_token", &self.parts.access_token)
			.field("refresh_token", &self.parts.refresh_token)
			.field("expires_at", &self.parts.expires_at)
			.field("refresh_expires_at", &self.parts.refresh_expires_at)
			.field("scope", &self.parts.scope)
			.field("app_id", &self.parts.app_id)
			.field("account_id", &self.parts.account_id)
			.finish_non_exhaustive()
	}
}
impl Serialize for Token {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		self.to_map().serialize(serializer)
	}
}

fn rfc3339(at: OffsetDateTime) -> Option<Value> {
	at.format(&Rfc3339).ok().map(Value::from)
}
