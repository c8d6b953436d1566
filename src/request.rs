//! Authenticated API requests and their decoded responses.

// crates.io
use oauth2::http::{
	self, HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, LOCATION, USER_AGENT},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	classify,
	error::{ArgumentError, ConfigError, TransientError},
	http::{HttpRequest, HttpResponse},
	token::TokenSecret,
};

/// Media type requested from the API.
pub const MEDIA_TYPE: &str = "application/vnd.dwolla.v1.hal+json";
/// `User-Agent` sent with every request.
pub const USER_AGENT_VALUE: &str = concat!("dwolla-v2-rust/", env!("CARGO_PKG_VERSION"));

/// Location of an API resource: a path relative to the API base URL or an absolute URL.
///
/// HAL resources convert through [`TryFrom<&Value>`], which reads `_links.self.href`
/// without touching the resource itself.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ApiPath(String);
impl ApiPath {
	/// Wraps a path or URL.
	pub fn new(path: impl Into<String>) -> Self {
		Self(path.into())
	}

	/// Returns the raw path text.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Returns `true` for absolute `http(s)` URLs.
	pub fn is_absolute(&self) -> bool {
		let lower = self.0.get(..8).unwrap_or(&self.0).to_ascii_lowercase();

		lower.starts_with("https://") || lower.starts_with("http://")
	}

	/// Resolves the path against `api_url`, joining the two with exactly one `/`.
	///
	/// Absolute URLs keep only their path and query; the bearer token is never sent to a
	/// host other than `api_url`'s.
	pub fn resolve(&self, api_url: &str) -> Result<Url, ConfigError> {
		let relative = if self.is_absolute() {
			let url = parse_url(&self.0)?;

			match url.query() {
				Some(query) => Cow::Owned(format!("{}?{query}", url.path())),
				None => Cow::Owned(url.path().to_owned()),
			}
		} else {
			Cow::Borrowed(self.0.as_str())
		};

		parse_url(&format!(
			"{}/{}",
			api_url.trim_end_matches('/'),
			relative.trim_start_matches('/')
		))
	}
}
impl Display for ApiPath {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl From<&str> for ApiPath {
	fn from(path: &str) -> Self {
		Self::new(path)
	}
}
impl From<String> for ApiPath {
	fn from(path: String) -> Self {
		Self(path)
	}
}
impl From<&String> for ApiPath {
	fn from(path: &String) -> Self {
		Self::new(path.as_str())
	}
}
impl From<Url> for ApiPath {
	fn from(url: Url) -> Self {
		Self(url.into())
	}
}
impl From<&Url> for ApiPath {
	fn from(url: &Url) -> Self {
		Self::new(url.as_str())
	}
}
impl TryFrom<&Value> for ApiPath {
	type Error = ArgumentError;

	fn try_from(resource: &Value) -> Result<Self, Self::Error> {
		resource
			.pointer("/_links/self/href")
			.and_then(Value::as_str)
			.map(Self::new)
			.ok_or(ArgumentError::MissingSelfLink)
	}
}

/// Builder for a single API call.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	method: Method,
	path: ApiPath,
	query: Vec<(String, String)>,
	headers: HeaderMap,
	body: Option<Value>,
}
impl ApiRequest {
	/// Creates a request without query, body, or extra headers.
	pub fn new(method: Method, path: impl Into<ApiPath>) -> Self {
		Self {
			method,
			path: path.into(),
			query: Vec::new(),
			headers: HeaderMap::new(),
			body: None,
		}
	}

	/// `GET` request.
	pub fn get(path: impl Into<ApiPath>) -> Self {
		Self::new(Method::GET, path)
	}

	/// `POST` request.
	pub fn post(path: impl Into<ApiPath>) -> Self {
		Self::new(Method::POST, path)
	}

	/// `PUT` request.
	pub fn put(path: impl Into<ApiPath>) -> Self {
		Self::new(Method::PUT, path)
	}

	/// `PATCH` request.
	pub fn patch(path: impl Into<ApiPath>) -> Self {
		Self::new(Method::PATCH, path)
	}

	/// `DELETE` request.
	pub fn delete(path: impl Into<ApiPath>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Appends URL-encoded query pairs.
	pub fn query<I, K, V>(mut self, pairs: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.query.extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));

		self
	}

	/// Sets the JSON body.
	pub fn body(mut self, body: impl Into<Option<Value>>) -> Self {
		self.body = body.into();

		self
	}

	/// Sets a header, replacing any default with the same name.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Merges caller headers; they are applied after the defaults.
	pub fn headers(mut self, headers: HeaderMap) -> Self {
		self.headers.extend(headers);

		self
	}

	/// HTTP method.
	pub fn method(&self) -> &Method {
		&self.method
	}

	/// Target path.
	pub fn path(&self) -> &ApiPath {
		&self.path
	}

	/// JSON body, if any.
	pub fn json_body(&self) -> Option<&Value> {
		self.body.as_ref()
	}

	pub(crate) fn to_http(
		&self,
		api_url: &str,
		access_token: &TokenSecret,
	) -> Result<HttpRequest> {
		let mut url = self.path.resolve(api_url)?;

		if !self.query.is_empty() {
			url.query_pairs_mut().extend_pairs(&self.query);
		}

		let mut builder = http::Request::builder()
			.method(self.method.clone())
			.uri(url.as_str())
			.header(ACCEPT, MEDIA_TYPE)
			.header(AUTHORIZATION, access_token.bearer()?)
			.header(USER_AGENT, USER_AGENT_VALUE);
		let body = match &self.body {
			Some(body) => {
				builder = builder.header(CONTENT_TYPE, "application/json");

				body.to_string().into_bytes()
			},
			None => Vec::new(),
		};
		let mut request = builder.body(body).map_err(ConfigError::from)?;
		let headers = request.headers_mut();

		for name in self.headers.keys() {
			headers.remove(name);
		}
		for (name, value) in &self.headers {
			headers.append(name, value.clone());
		}

		Ok(request)
	}
}

fn parse_url(raw: &str) -> Result<Url, ConfigError> {
	Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { url: raw.to_owned(), source })
}

/// Decoded 2xx response.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	status: StatusCode,
	headers: HeaderMap,
	body: Option<Value>,
}
impl ApiResponse {
	/// Decodes a raw response, classifying non-2xx statuses.
	pub fn from_http(response: HttpResponse) -> Result<Self> {
		let status = response.status();
		let (parts, body) = response.into_parts();

		if !status.is_success() {
			return Err(classify::classify_bytes(status.as_u16(), &body).into());
		}

		let body = if body.iter().all(u8::is_ascii_whitespace) {
			None
		} else {
			let mut de = serde_json::Deserializer::from_slice(&body);

			Some(serde_path_to_error::deserialize(&mut de).map_err(|source| {
				TransientError::ResponseParse { source, status: Some(status.as_u16()) }
			})?)
		};

		Ok(Self { status, headers: parts.headers, body })
	}

	/// HTTP status.
	pub fn status(&self) -> StatusCode {
		self.status
	}

	/// Response headers.
	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	/// Decoded JSON body; `None` when the response had no content.
	pub fn body(&self) -> Option<&Value> {
		self.body.as_ref()
	}

	/// Consumes the response and returns its body.
	pub fn into_body(self) -> Option<Value> {
		self.body
	}

	/// `Location` header of a `201 Created` response.
	pub fn location(&self) -> Option<&str> {
		self.headers.get(LOCATION).and_then(|value| value.to_str().ok())
	}

	/// Deserializes the body into `T`, reporting the JSON path of any mismatch.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let parsed = match &self.body {
			Some(body) => serde_path_to_error::deserialize(body),
			None => serde_path_to_error::deserialize(&Value::Null),
		};

		parsed.map_err(|source| {
			TransientError::ResponseParse { source, status: Some(self.status.as_u16()) }.into()
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::classify::ApiErrorKind;

	const API_URL: &str = "https://api-sandbox.dwolla.com";

	#[test]
	fn leading_slash_does_not_change_resolution() {
		let with = ApiPath::from("/customers").resolve(API_URL).expect("Path should resolve.");
		let without = ApiPath::from("customers").resolve(API_URL).expect("Path should resolve.");
		let trailing = ApiPath::from("customers")
			.resolve("https://api-sandbox.dwolla.com/")
			.expect("Path should resolve.");

		assert_eq!(with.as_str(), "https://api-sandbox.dwolla.com/customers");
		assert_eq!(with, without);
		assert_eq!(with, trailing);
	}

	#[test]
	fn absolute_urls_are_rebased_onto_the_api_host() {
		let same_host = ApiPath::from("https://api-sandbox.dwolla.com/accounts/abc")
			.resolve(API_URL)
			.expect("Absolute URL should resolve.");
		let foreign = ApiPath::from("https://foo-bar.com/accounts/abc?limit=5#top")
			.resolve(API_URL)
			.expect("Foreign URL should resolve.");

		assert_eq!(same_host.as_str(), "https://api-sandbox.dwolla.com/accounts/abc");
		assert_eq!(foreign.as_str(), "https://api-sandbox.dwolla.com/accounts/abc?limit=5");
		assert!(ApiPath::from("HTTPS://foo-bar.com/x").is_absolute());
		assert!(!ApiPath::from("customers").is_absolute());
	}

	#[test]
	fn hal_resources_yield_their_self_link() {
		let resource = json!({
			"_links": { "self": { "href": "https://api-sandbox.dwolla.com/customers/123" } },
			"firstName": "Jane"
		});
		let snapshot = resource.clone();
		let path = ApiPath::try_from(&resource).expect("HAL resource should carry a self link.");

		assert_eq!(path.as_str(), "https://api-sandbox.dwolla.com/customers/123");
		assert_eq!(resource, snapshot);
		assert_eq!(
			ApiPath::try_from(&json!({ "id": 1 })),
			Err(ArgumentError::MissingSelfLink)
		);
	}

	#[test]
	fn http_request_carries_defaults_and_caller_overrides() {
		let request = ApiRequest::post("customers")
			.query([("limit", "10")])
			.body(json!({ "firstName": "Jane" }))
			.header(ACCEPT, HeaderValue::from_static("application/json"))
			.header(
				HeaderName::from_static("idempotency-key"),
				HeaderValue::from_static("abc"),
			)
			.to_http(API_URL, &TokenSecret::new("token-1"))
			.expect("Request should build.");

		assert_eq!(request.method(), &Method::POST);
		assert_eq!(request.uri(), "https://api-sandbox.dwolla.com/customers?limit=10");
		assert_eq!(request.headers()[ACCEPT], "application/json");
		assert_eq!(request.headers().get_all(ACCEPT).iter().count(), 1);
		assert_eq!(request.headers()[AUTHORIZATION], "Bearer token-1");
		assert_eq!(request.headers()[CONTENT_TYPE], "application/json");
		assert_eq!(request.headers()["idempotency-key"], "abc");
		assert_eq!(request.headers()[USER_AGENT], USER_AGENT_VALUE);
		assert_eq!(request.body().as_slice(), br#"{"firstName":"Jane"}"#);
	}

	#[test]
	fn bodiless_requests_omit_content_type() {
		let request = ApiRequest::get("/")
			.to_http(API_URL, &TokenSecret::new("token-1"))
			.expect("Request should build.");

		assert!(request.headers().get(CONTENT_TYPE).is_none());
		assert_eq!(request.headers()[ACCEPT], MEDIA_TYPE);
		assert!(request.body().is_empty());
	}

	fn raw_response(status: u16, body: &str) -> HttpResponse {
		let mut response = HttpResponse::new(body.as_bytes().to_vec());

		*response.status_mut() =
			StatusCode::from_u16(status).expect("Test statuses should be valid.");

		response
	}

	#[test]
	fn empty_success_bodies_decode_to_none() {
		let response =
			ApiResponse::from_http(raw_response(200, "")).expect("Empty 200 should decode.");

		assert_eq!(response.status(), StatusCode::OK);
		assert!(response.body().is_none());
	}

	#[test]
	fn failures_are_classified() {
		let err = ApiResponse::from_http(raw_response(404, r#"{"code":"NotFound"}"#))
			.expect_err("404 should fail.");

		assert_eq!(err.api().map(|err| err.kind()), Some(ApiErrorKind::NotFound));
	}

	#[test]
	fn typed_decoding_reports_the_failing_path() {
		#[derive(Debug, Deserialize)]
		struct Customer {
			#[serde(rename = "firstName")]
			_first_name: String,
		}

		let response = ApiResponse::from_http(raw_response(200, r#"{"firstName":7}"#))
			.expect("Valid JSON should decode.");
		let err = response.json::<Customer>().expect_err("Numbers are not strings.");
		let Error::Transient(TransientError::ResponseParse { source, .. }) = err else {
			panic!("Type mismatches should surface as parse errors.");
		};

		assert_eq!(source.path().to_string(), "firstName");
	}
}
