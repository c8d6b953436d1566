//! Optional observability helpers for token exchanges and API requests.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `dwolla_v2.flow` with the `flow` (grant or
//!   request) and `stage` (call site) fields.
//! - Enable `metrics` to increment the `dwolla_v2_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`, and `dwolla_v2_api_error_total`
//!   for every classified failure, labeled by `flow` + `kind`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Client-credentials exchange backing the client's cached token.
	ClientCredentials,
	/// Authorization-code exchange.
	AuthorizationCode,
	/// Refresh-token exchange, explicit or triggered by an expired access token.
	RefreshToken,
	/// Exchange for a caller-defined grant type.
	OtherGrant,
	/// Authenticated API request.
	ApiRequest,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::ClientCredentials => "client_credentials",
			FlowKind::AuthorizationCode => "authorization_code",
			FlowKind::RefreshToken => "refresh_token",
			FlowKind::OtherGrant => "other_grant",
			FlowKind::ApiRequest => "api_request",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to an exchange or request.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` inside a [`FlowSpan`] and records its attempt and outcome.
pub(crate) async fn observe<T, Fut>(kind: FlowKind, stage: &'static str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = FlowSpan::new(kind, stage);

	span.instrument(async {
		record_flow_outcome(kind, FlowOutcome::Attempt);

		let result = fut.await;

		match &result {
			Ok(_) => record_flow_outcome(kind, FlowOutcome::Success),
			Err(err) => {
				span.record_failure(err);
				record_flow_outcome(kind, FlowOutcome::Failure);

				if let Some(api) = err.api() {
					record_api_error(kind, api.kind());
				}
			},
		}

		result
	})
	.await
}
