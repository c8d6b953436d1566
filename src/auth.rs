//! Authorization-code flow: the URL users are sent to and the redirect handler.

// crates.io
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	classify::{self, OAuthError},
	client::{Client, GrantParams, GrantType},
	error::ArgumentError,
	token::Token,
};

/// Parameters of an authorization request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthParams {
	/// Where Dwolla sends the user back to; must match the application's settings.
	pub redirect_uri: Option<String>,
	/// Requested scopes, e.g. `Send|Funding`.
	pub scope: Option<String>,
	/// Opaque value echoed back to the redirect URI.
	pub state: Option<String>,
	/// Landing page shown by Dwolla, e.g. `register`.
	pub dwolla_landing: Option<String>,
}
impl AuthParams {
	/// Sets the redirect URI.
	pub fn redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
		self.redirect_uri = Some(redirect_uri.into());

		self
	}

	/// Sets the requested scopes.
	pub fn scope(mut self, scope: impl Into<String>) -> Self {
		self.scope = Some(scope.into());

		self
	}

	/// Sets the state value.
	pub fn state(mut self, state: impl Into<String>) -> Self {
		self.state = Some(state.into());

		self
	}

	/// Sets the landing page.
	pub fn dwolla_landing(mut self, landing: impl Into<String>) -> Self {
		self.dwolla_landing = Some(landing.into());

		self
	}
}

/// Authorization-code flow bound to one client.
#[derive(Clone, Debug)]
pub struct Auth {
	client: Client,
	params: AuthParams,
}
impl Auth {
	/// Binds `params` to `client`.
	pub fn new(client: Client, params: AuthParams) -> Self {
		Self { client, params }
	}

	/// Parameters this flow was started with.
	pub fn params(&self) -> &AuthParams {
		&self.params
	}

	/// URL of the authorization page, with unset parameters omitted.
	pub fn url(&self) -> String {
		let mut query = form_urlencoded::Serializer::new(String::new());

		query.append_pair("response_type", "code");
		query.append_pair("client_id", self.client.id());

		let optional = [
			("redirect_uri", &self.params.redirect_uri),
			("scope", &self.params.scope),
			("state", &self.params.state),
			("dwolla_landing", &self.params.dwolla_landing),
		];

		for (key, value) in optional {
			if let Some(value) = value {
				query.append_pair(key, value);
			}
		}

		format!("{}?{}", self.client.endpoints().auth_url, query.finish())
	}

	/// Handles the redirect back from Dwolla and exchanges the returned code.
	///
	/// `params` are the query parameters of the redirect. When this flow was started with a
	/// `state`, the redirect must echo it; an OAuth `error` in the redirect is classified and
	/// returned without contacting the token endpoint.
	pub async fn callback(&self, params: &GrantParams) -> Result<Token> {
		if self.params.state.is_some() && params.get("state") != self.params.state.as_ref() {
			return Err(ArgumentError::StateMismatch.into());
		}
		if let Some(error) = params.get("error") {
			let error = OAuthError {
				status: None,
				error: error.to_owned(),
				description: params.get("error_description").cloned(),
				uri: params.get("error_uri").cloned(),
			};

			return Err(classify::classify_oauth(error).into());
		}

		let code = params
			.get("code")
			.filter(|code| !code.is_empty())
			.ok_or(ArgumentError::Missing { name: "code" })?;
		let mut grant = GrantParams::from([("code".to_owned(), code.to_owned())]);

		if let Some(redirect_uri) = &self.params.redirect_uri {
			grant.insert("redirect_uri".into(), redirect_uri.to_owned());
		}

		self.client.exchange(GrantType::AuthorizationCode, grant).await
	}
}
