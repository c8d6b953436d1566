//! Token-endpoint exchange shared by every grant.

// crates.io
use oauth2::http::{
	self, Method,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT},
};
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	classify,
	client::{ClientCore, TokenCache},
	error::{ArgumentError, ConfigError, TransientError},
	http::HttpRequest,
	obs::{self, FlowKind},
	request::USER_AGENT_VALUE,
	token::{Token, TokenFields, TokenParts},
};

/// Extra form parameters sent to the token endpoint.
pub type GrantParams = BTreeMap<String, String>;

/// OAuth 2.0 grant requested from the token endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum GrantType {
	/// Application-level token for the client's own credentials.
	ClientCredentials,
	/// Exchange of an authorization code returned to the redirect URI.
	AuthorizationCode,
	/// Renewal with a refresh token.
	RefreshToken,
	/// Any other grant understood by the token endpoint.
	Other(Cow<'static, str>),
}
impl GrantType {
	/// Returns the `grant_type` form value.
	pub fn as_str(&self) -> &str {
		match self {
			Self::ClientCredentials => "client_credentials",
			Self::AuthorizationCode => "authorization_code",
			Self::RefreshToken => "refresh_token",
			Self::Other(grant) => &**grant,
		}
	}

	fn flow(&self) -> FlowKind {
		match self {
			Self::ClientCredentials => FlowKind::ClientCredentials,
			Self::AuthorizationCode => FlowKind::AuthorizationCode,
			Self::RefreshToken => FlowKind::RefreshToken,
			Self::Other(_) => FlowKind::OtherGrant,
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Successful token-endpoint payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
	/// Bearer credential.
	#[serde(default)]
	pub access_token: Option<String>,
	/// Token type, normally `bearer`.
	#[serde(default)]
	pub token_type: Option<String>,
	/// Refresh credential for user-level grants.
	#[serde(default)]
	pub refresh_token: Option<String>,
	/// Access-token lifetime in seconds.
	#[serde(default)]
	pub expires_in: Option<i64>,
	/// Refresh-token lifetime in seconds.
	#[serde(default)]
	pub refresh_expires_in: Option<i64>,
	/// Granted scopes.
	#[serde(default)]
	pub scope: Option<String>,
	/// Application identifier.
	#[serde(default)]
	pub app_id: Option<String>,
	/// Account identifier.
	#[serde(default)]
	pub account_id: Option<String>,
}
impl TokenFields for TokenResponse {
	fn access_token(&self) -> Option<String> {
		self.access_token.clone()
	}

	fn refresh_token(&self) -> Option<String> {
		self.refresh_token.clone()
	}

	fn expires_in(&self) -> Option<i64> {
		self.expires_in
	}

	fn refresh_expires_in(&self) -> Option<i64> {
		self.refresh_expires_in
	}

	fn scope(&self) -> Option<String> {
		self.scope.clone()
	}

	fn app_id(&self) -> Option<String> {
		self.app_id.clone()
	}

	fn account_id(&self) -> Option<String> {
		self.account_id.clone()
	}
}

impl ClientCore {
	/// Exchanges a grant for a new token bound to this core and `cache`.
	pub(crate) async fn exchange(
		self: &Arc<Self>,
		cache: &Weak<TokenCache>,
		grant: &GrantType,
		params: &GrantParams,
	) -> Result<Token> {
		obs::observe(grant.flow(), "exchange", self.exchange_once(cache, grant, params)).await
	}

	/// Exchanges the refresh token carried by `token`.
	pub(crate) async fn refresh(
		self: &Arc<Self>,
		cache: &Weak<TokenCache>,
		token: &Token,
	) -> Result<Token> {
		let refresh_token =
			token.refresh_token().ok_or(ArgumentError::Missing { name: "refresh_token" })?;
		let params = GrantParams::from([("refresh_token".into(), refresh_token.expose().into())]);

		self.exchange(cache, &GrantType::RefreshToken, &params).await
	}

	async fn exchange_once(
		self: &Arc<Self>,
		cache: &Weak<TokenCache>,
		grant: &GrantType,
		params: &GrantParams,
	) -> Result<Token> {
		let request = self.token_request(grant, params)?;
		let response = self.send(request).await?;
		let issued_at = OffsetDateTime::now_utc();
		let status = response.status().as_u16();

		if !response.status().is_success() {
			return Err(classify::classify_bytes(status, response.body()).into());
		}

		let mut de = serde_json::Deserializer::from_slice(response.body());
		let payload: TokenResponse = serde_path_to_error::deserialize(&mut de)
			.map_err(|source| TransientError::ResponseParse { source, status: Some(status) })?;
		let parts = TokenParts::from_fields(&payload, issued_at).map_err(|_| {
			TransientError::Upstream {
				message: "token response is missing `access_token`".into(),
				status: Some(status),
			}
		})?;
		let token = parts.bind(Arc::clone(self), cache.clone());

		self.notify(&token);

		Ok(token)
	}

	fn token_request(&self, grant: &GrantType, params: &GrantParams) -> Result<HttpRequest> {
		let mut form = form_urlencoded::Serializer::new(String::new());

		form.append_pair("grant_type", grant.as_str());

		for (key, value) in params.iter().filter(|(key, _)| key.as_str() != "grant_type") {
			form.append_pair(key, value);
		}

		let request = http::Request::builder()
			.method(Method::POST)
			.uri(&*self.endpoints.token_url)
			.header(AUTHORIZATION, self.secret.basic(&self.id)?)
			.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
			.header(ACCEPT, "application/json")
			.header(USER_AGENT, USER_AGENT_VALUE)
			.body(form.finish().into_bytes())
			.map_err(ConfigError::from)?;

		Ok(request)
	}
}
