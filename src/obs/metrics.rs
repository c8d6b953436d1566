//! Counters behind the `metrics` feature; no-ops without it.

// self
use crate::{
	classify::ApiErrorKind,
	obs::{FlowKind, FlowOutcome},
};

/// Counter of exchanges and requests, labeled `flow` and `outcome`.
pub const FLOW_TOTAL: &str = "dwolla_v2_flow_total";
/// Counter of classified API failures, labeled `flow` and `kind`.
pub const API_ERROR_TOTAL: &str = "dwolla_v2_api_error_total";

/// Counts one attempt, success, or failure of `kind`.
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(FLOW_TOTAL, "flow" => kind.as_str(), "outcome" => outcome.as_str())
			.increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Counts a failure of `kind` that the classifier tagged as `error`.
pub fn record_api_error(kind: FlowKind, error: ApiErrorKind) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(API_ERROR_TOTAL, "flow" => kind.as_str(), "kind" => error.as_str())
			.increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, error);
	}
}
