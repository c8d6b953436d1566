//! Error classification for token-endpoint and API responses.
//!
//! Dwolla answers with two body shapes. The token endpoint follows RFC 6749 and
//! reports `{"error": "...", "error_description": "..."}`, while the API reports
//! `{"code": "...", "message": "...", "_embedded": {"errors": [...]}}`. [`classify`]
//! inspects the body in that order and falls back to [`ApiError::Http`] when neither
//! shape is present, so every non-2xx response resolves to exactly one variant.

// self
use crate::_prelude::*;

const BODY_PREVIEW_LIMIT: usize = 256;

/// OAuth 2.0 error payload returned by the token and authorization endpoints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OAuthError {
	/// HTTP status code; absent when the error arrived through a redirect.
	pub status: Option<u16>,
	/// Short machine code from the `error` field.
	pub error: String,
	/// Human-readable `error_description`.
	pub description: Option<String>,
	/// Optional `error_uri` pointing at documentation.
	pub uri: Option<String>,
}
impl Display for OAuthError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match &self.description {
			Some(description) => write!(f, "OAuth error `{}`: {description}", self.error),
			None => write!(f, "OAuth error `{}`", self.error),
		}
	}
}

/// Dwolla API error payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VendorError {
	/// HTTP status code.
	pub status: u16,
	/// Dwolla error code, e.g. `NotFound`.
	pub code: String,
	/// Human-readable message.
	pub message: Option<String>,
}
impl Display for VendorError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match &self.message {
			Some(message) => write!(f, "{} (HTTP {}): {message}", self.code, self.status),
			None => write!(f, "{} (HTTP {})", self.code, self.status),
		}
	}
}

/// Field-level violation reported inside a `ValidationError` body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
	/// JSON pointer to the offending field (the `path` member).
	#[serde(default, rename = "path")]
	pub field: Option<String>,
	/// Human-readable description.
	#[serde(default)]
	pub message: Option<String>,
	/// Violation code, e.g. `Required` or `Invalid`.
	#[serde(default)]
	pub code: Option<String>,
}

/// Stable tag for each [`ApiError`] variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
	/// `invalid_request`
	InvalidRequest,
	/// `invalid_client`
	InvalidClient,
	/// `invalid_grant`
	InvalidGrant,
	/// `invalid_scope`
	InvalidScope,
	/// `unauthorized_client`
	UnauthorizedClient,
	/// `access_denied`
	AccessDenied,
	/// `unsupported_response_type`
	UnsupportedResponseType,
	/// `server_error`
	ServerError,
	/// `temporarily_unavailable`
	TemporarilyUnavailable,
	/// `unsupported_grant_type`
	UnsupportedGrantType,
	/// Any other OAuth `error` value.
	OAuth,
	/// `BadRequest`
	BadRequest,
	/// `ValidationError`
	ValidationError,
	/// `InvalidCredentials`
	InvalidCredentials,
	/// `InvalidAccessToken`
	InvalidAccessToken,
	/// `ExpiredAccessToken`
	ExpiredAccessToken,
	/// `InvalidAccountStatus`
	InvalidAccountStatus,
	/// `InvalidApplicationStatus`
	InvalidApplicationStatus,
	/// `InvalidScopes`
	InvalidScopes,
	/// `Forbidden`
	Forbidden,
	/// `NotFound`
	NotFound,
	/// `MethodNotAllowed`
	MethodNotAllowed,
	/// `InvalidVersion`
	InvalidVersion,
	/// `RequestTimeout`
	RequestTimeout,
	/// `InvalidResourceState`
	InvalidResourceState,
	/// Any other Dwolla `code` value.
	Vendor,
	/// Response without a recognizable error body.
	Http,
}
impl ApiErrorKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::InvalidRequest => "invalid_request",
			Self::InvalidClient => "invalid_client",
			Self::InvalidGrant => "invalid_grant",
			Self::InvalidScope => "invalid_scope",
			Self::UnauthorizedClient => "unauthorized_client",
			Self::AccessDenied => "access_denied",
			Self::UnsupportedResponseType => "unsupported_response_type",
			Self::ServerError => "server_error",
			Self::TemporarilyUnavailable => "temporarily_unavailable",
			Self::UnsupportedGrantType => "unsupported_grant_type",
			Self::OAuth => "oauth_error",
			Self::BadRequest => "BadRequest",
			Self::ValidationError => "ValidationError",
			Self::InvalidCredentials => "InvalidCredentials",
			Self::InvalidAccessToken => "InvalidAccessToken",
			Self::ExpiredAccessToken => "ExpiredAccessToken",
			Self::InvalidAccountStatus => "InvalidAccountStatus",
			Self::InvalidApplicationStatus => "InvalidApplicationStatus",
			Self::InvalidScopes => "InvalidScopes",
			Self::Forbidden => "Forbidden",
			Self::NotFound => "NotFound",
			Self::MethodNotAllowed => "MethodNotAllowed",
			Self::InvalidVersion => "InvalidVersion",
			Self::RequestTimeout => "RequestTimeout",
			Self::InvalidResourceState => "InvalidResourceState",
			Self::Vendor => "vendor_error",
			Self::Http => "http_error",
		}
	}
}
impl Display for ApiErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Classified failure returned by the token endpoint or the API.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ApiError {
	/// The request is missing a parameter or is otherwise malformed.
	#[error("{0}.")]
	InvalidRequest(OAuthError),
	/// Client authentication failed.
	#[error("{0}.")]
	InvalidClient(OAuthError),
	/// The grant (code or refresh token) is invalid, expired, or revoked.
	#[error("{0}.")]
	InvalidGrant(OAuthError),
	/// The requested scope is invalid or exceeds the granted scope.
	#[error("{0}.")]
	InvalidScope(OAuthError),
	/// The client may not use this grant type.
	#[error("{0}.")]
	UnauthorizedClient(OAuthError),
	/// The resource owner denied the request.
	#[error("{0}.")]
	AccessDenied(OAuthError),
	/// The authorization server does not support this response type.
	#[error("{0}.")]
	UnsupportedResponseType(OAuthError),
	/// The authorization server hit an unexpected condition.
	#[error("{0}.")]
	ServerError(OAuthError),
	/// The authorization server is temporarily overloaded or under maintenance.
	#[error("{0}.")]
	TemporarilyUnavailable(OAuthError),
	/// The grant type is not supported.
	#[error("{0}.")]
	UnsupportedGrantType(OAuthError),
	/// An OAuth error value outside RFC 6749.
	#[error("{0}.")]
	OAuth(OAuthError),
	/// The request body could not be understood.
	#[error("{0}.")]
	BadRequest(VendorError),
	/// One or more request fields failed validation.
	#[error("{error}.")]
	ValidationError {
		/// Code and message of the failure.
		error: VendorError,
		/// Field-level violations from `_embedded.errors`.
		violations: Vec<FieldViolation>,
	},
	/// The client credentials are invalid.
	#[error("{0}.")]
	InvalidCredentials(VendorError),
	/// The access token is invalid.
	#[error("{0}.")]
	InvalidAccessToken(VendorError),
	/// The access token has expired; a refresh token can renew it.
	#[error("{0}.")]
	ExpiredAccessToken(VendorError),
	/// The account status does not allow the operation.
	#[error("{0}.")]
	InvalidAccountStatus(VendorError),
	/// The application status does not allow the operation.
	#[error("{0}.")]
	InvalidApplicationStatus(VendorError),
	/// The token lacks the scopes required by the endpoint.
	#[error("{0}.")]
	InvalidScopes(VendorError),
	/// The caller may not access the resource.
	#[error("{0}.")]
	Forbidden(VendorError),
	/// The resource does not exist.
	#[error("{0}.")]
	NotFound(VendorError),
	/// The HTTP method is not allowed on the resource.
	#[error("{0}.")]
	MethodNotAllowed(VendorError),
	/// The `Accept` header does not name a supported API version.
	#[error("{0}.")]
	InvalidVersion(VendorError),
	/// The request took too long to complete.
	#[error("{0}.")]
	RequestTimeout(VendorError),
	/// The resource cannot be modified in its current state.
	#[error("{0}.")]
	InvalidResourceState(VendorError),
	/// A Dwolla error code without a dedicated variant.
	#[error("{0}.")]
	Vendor(VendorError),
	/// A failure without a recognizable error body.
	#[error("HTTP {status} without a recognizable error body.")]
	Http {
		/// HTTP status code.
		status: u16,
		/// Truncated body text for diagnostics.
		body_preview: Option<String>,
	},
}
impl ApiError {
	/// Returns the tag for this variant.
	pub fn kind(&self) -> ApiErrorKind {
		match self {
			Self::InvalidRequest(_) => ApiErrorKind::InvalidRequest,
			Self::InvalidClient(_) => ApiErrorKind::InvalidClient,
			Self::InvalidGrant(_) => ApiErrorKind::InvalidGrant,
			Self::InvalidScope(_) => ApiErrorKind::InvalidScope,
			Self::UnauthorizedClient(_) => ApiErrorKind::UnauthorizedClient,
			Self::AccessDenied(_) => ApiErrorKind::AccessDenied,
			Self::UnsupportedResponseType(_) => ApiErrorKind::UnsupportedResponseType,
			Self::ServerError(_) => ApiErrorKind::ServerError,
			Self::TemporarilyUnavailable(_) => ApiErrorKind::TemporarilyUnavailable,
			Self::UnsupportedGrantType(_) => ApiErrorKind::UnsupportedGrantType,
			Self::OAuth(_) => ApiErrorKind::OAuth,
			Self::BadRequest(_) => ApiErrorKind::BadRequest,
			Self::ValidationError { .. } => ApiErrorKind::ValidationError,
			Self::InvalidCredentials(_) => ApiErrorKind::InvalidCredentials,
			Self::InvalidAccessToken(_) => ApiErrorKind::InvalidAccessToken,
			Self::ExpiredAccessToken(_) => ApiErrorKind::ExpiredAccessToken,
			Self::InvalidAccountStatus(_) => ApiErrorKind::InvalidAccountStatus,
			Self::InvalidApplicationStatus(_) => ApiErrorKind::InvalidApplicationStatus,
			Self::InvalidScopes(_) => ApiErrorKind::InvalidScopes,
			Self::Forbidden(_) => ApiErrorKind::Forbidden,
			Self::NotFound(_) => ApiErrorKind::NotFound,
			Self::MethodNotAllowed(_) => ApiErrorKind::MethodNotAllowed,
			Self::InvalidVersion(_) => ApiErrorKind::InvalidVersion,
			Self::RequestTimeout(_) => ApiErrorKind::RequestTimeout,
			Self::InvalidResourceState(_) => ApiErrorKind::InvalidResourceState,
			Self::Vendor(_) => ApiErrorKind::Vendor,
			Self::Http { .. } => ApiErrorKind::Http,
		}
	}

	/// HTTP status code of the failing response, when one exists.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Http { status, .. } => Some(*status),
			_ => match (self.oauth(), self.vendor()) {
				(Some(oauth), _) => oauth.status,
				(_, Some(vendor)) => Some(vendor.status),
				_ => None,
			},
		}
	}

	/// Short machine code: the OAuth `error` value or the Dwolla `code`.
	pub fn error(&self) -> Option<&str> {
		self.oauth()
			.map(|oauth| oauth.error.as_str())
			.or_else(|| self.vendor().map(|vendor| vendor.code.as_str()))
	}

	/// Dwolla `code`, or the OAuth `error` value for token-endpoint failures.
	pub fn code(&self) -> Option<&str> {
		self.error()
	}

	/// Human-readable message (`message` or `error_description`).
	pub fn message(&self) -> Option<&str> {
		self.oauth()
			.and_then(|oauth| oauth.description.as_deref())
			.or_else(|| self.vendor().and_then(|vendor| vendor.message.as_deref()))
	}

	/// Alias of [`ApiError::message`] using OAuth vocabulary.
	pub fn description(&self) -> Option<&str> {
		self.message()
	}

	/// Field-level violations; empty unless this is a validation failure.
	pub fn violations(&self) -> &[FieldViolation] {
		match self {
			Self::ValidationError { violations, .. } => violations,
			_ => &[],
		}
	}

	/// Returns `true` when a refresh-and-retry can recover from this failure.
	pub fn is_expired_access_token(&self) -> bool {
		matches!(self, Self::ExpiredAccessToken(_))
	}

	/// Returns the OAuth payload for token-endpoint variants.
	pub fn oauth(&self) -> Option<&OAuthError> {
		match self {
			Self::InvalidRequest(e)
			| Self::InvalidClient(e)
			| Self::InvalidGrant(e)
			| Self::InvalidScope(e)
			| Self::UnauthorizedClient(e)
			| Self::AccessDenied(e)
			| Self::UnsupportedResponseType(e)
			| Self::ServerError(e)
			| Self::TemporarilyUnavailable(e)
			| Self::UnsupportedGrantType(e)
			| Self::OAuth(e) => Some(e),
			_ => None,
		}
	}

	/// Returns the Dwolla payload for API variants.
	pub fn vendor(&self) -> Option<&VendorError> {
		match self {
			Self::BadRequest(e)
			| Self::ValidationError { error: e, .. }
			| Self::InvalidCredentials(e)
			| Self::InvalidAccessToken(e)
			| Self::ExpiredAccessToken(e)
			| Self::InvalidAccountStatus(e)
			| Self::InvalidApplicationStatus(e)
			| Self::InvalidScopes(e)
			| Self::Forbidden(e)
			| Self::NotFound(e)
			| Self::MethodNotAllowed(e)
			| Self::InvalidVersion(e)
			| Self::RequestTimeout(e)
			| Self::InvalidResourceState(e)
			| Self::Vendor(e) => Some(e),
			_ => None,
		}
	}
}

/// Classifies a failing response from its status and decoded JSON body.
pub fn classify(status: u16, body: &Value) -> ApiError {
	if let Some(error) = string_member(body, "error") {
		return classify_oauth(
			OAuthError {
				status: Some(status),
				error,
				description: string_member(body, "error_description"),
				uri: string_member(body, "error_uri"),
			},
		);
	}
	if let Some(code) = string_member(body, "code") {
		let error = VendorError { status, code, message: string_member(body, "message") };

		return classify_vendor(error, body);
	}

	let body_preview = match body {
		Value::Null => None,
		other => Some(truncate_preview(other.to_string())),
	};

	ApiError::Http { status, body_preview }
}

/// Classifies a failing response from its raw body bytes.
///
/// Bodies that are not JSON resolve to [`ApiError::Http`] with a text preview.
pub fn classify_bytes(status: u16, body: &[u8]) -> ApiError {
	if body.iter().all(u8::is_ascii_whitespace) {
		return ApiError::Http { status, body_preview: None };
	}

	match serde_json::from_slice::<Value>(body) {
		Ok(value) => classify(status, &value),
		Err(_) => ApiError::Http {
			status,
			body_preview: Some(truncate_preview(String::from_utf8_lossy(body).into_owned())),
		},
	}
}

/// Maps an OAuth error payload onto its RFC 6749 variant.
pub fn classify_oauth(error: OAuthError) -> ApiError {
	match error.error.as_str() {
		"invalid_request" => ApiError::InvalidRequest(error),
		"invalid_client" => ApiError::InvalidClient(error),
		"invalid_grant" => ApiError::InvalidGrant(error),
		"invalid_scope" => ApiError::InvalidScope(error),
		"unauthorized_client" => ApiError::UnauthorizedClient(error),
		"access_denied" => ApiError::AccessDenied(error),
		"unsupported_response_type" => ApiError::UnsupportedResponseType(error),
		"server_error" => ApiError::ServerError(error),
		"temporarily_unavailable" => ApiError::TemporarilyUnavailable(error),
		"unsupported_grant_type" => ApiError::UnsupportedGrantType(error),
		_ => ApiError::OAuth(error),
	}
}

fn classify_vendor(error: VendorError, body: &Value) -> ApiError {
	match error.code.as_str() {
		"BadRequest" => ApiError::BadRequest(error),
		"ValidationError" => ApiError::ValidationError { error, violations: violations(body) },
		"InvalidCredentials" => ApiError::InvalidCredentials(error),
		"InvalidAccessToken" => ApiError::InvalidAccessToken(error),
		"ExpiredAccessToken" => ApiError::ExpiredAccessToken(error),
		"InvalidAccountStatus" => ApiError::InvalidAccountStatus(error),
		"InvalidApplicationStatus" => ApiError::InvalidApplicationStatus(error),
		"InvalidScopes" => ApiError::InvalidScopes(error),
		"Forbidden" => ApiError::Forbidden(error),
		"NotFound" => ApiError::NotFound(error),
		"MethodNotAllowed" => ApiError::MethodNotAllowed(error),
		"InvalidVersion" => ApiError::InvalidVersion(error),
		"RequestTimeout" => ApiError::RequestTimeout(error),
		"InvalidResourceState" => ApiError::InvalidResourceState(error),
		_ => ApiError::Vendor(error),
	}
}

fn violations(body: &Value) -> Vec<FieldViolation> {
	let Some(errors) = body.pointer("/_embedded/errors").and_then(Value::as_array) else {
		return Vec::new();
	};

	// Malformed entries degrade to empty records instead of failing classification.
	errors
		.iter()
		.map(|entry| FieldViolation::deserialize(entry).unwrap_or_default())
		.collect()
}

fn string_member(body: &Value, key: &str) -> Option<String> {
	match body.get(key)? {
		Value::Null => None,
		Value::String(value) => Some(value.clone()),
		other => Some(other.to_string()),
	}
}

fn truncate_preview(body: String) -> String {
	if body.chars().count() <= BODY_PREVIEW_LIMIT {
		return body;
	}

	let mut buf = String::new();

	for (idx, ch) in body.chars().enumerate() {
		if idx >= BODY_PREVIEW_LIMIT {
			buf.push('…');

			break;
		}
		buf.push(ch);
	}

	buf
}
