#![cfg(feature = "reqwest")]

mod common;

// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use common::*;
use dwolla_v2::{
	ApiError, ApiErrorKind, ApiRequest, Error, Token,
	http_types::{HeaderValue, header::ACCEPT},
};

fn bearer(client: &dwolla_v2::Client, access: &str, refresh: Option<&str>) -> Token {
	let mut fields = json!({ "access_token": access });

	if let Some(refresh) = refresh {
		fields["refresh_token"] = json!(refresh);
	}

	client.token(&fields).expect("Test tokens should wrap.")
}

#[tokio::test]
async fn leading_slash_and_bare_paths_hit_the_same_resource() {
	let server = MockServer::start_async().await;
	let client = client(&server);
	let token = bearer(&client, "t", None);
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/customers")
				.header("accept", MEDIA_TYPE)
				.header("authorization", "Bearer t")
				.header_exists("user-agent");
			then.status(200).json_body(json!({ "total": 0 }));
		})
		.await;

	token.get("/customers").await.expect("Leading slash should resolve.");
	token.get("customers").await.expect("Bare path should resolve.");

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn hal_resources_and_absolute_urls_are_requested_as_linked() {
	let server = MockServer::start_async().await;
	let client = client(&server);
	let token = bearer(&client, "t", None);
	let resource = json!({
		"_links": { "self": { "href": server.url("/customers/123") } },
		"firstName": "Jane"
	});
	let snapshot = resource.clone();
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/customers/123");
			then.status(200).json_body(json!({ "id": "123" }));
		})
		.await;

	token.get(&resource).await.expect("HAL resources should resolve to their self link.");
	token.get(server.url("/customers/123")).await.expect("Absolute URLs should resolve.");

	mock.assert_calls_async(2).await;

	assert_eq!(resource, snapshot);

	let err = token.get(&json!({ "id": 1 })).await.expect_err("Resources need a self link.");

	assert_eq!(err.to_string(), "Resource has no `_links.self.href` to request.");
}

#[tokio::test]
async fn foreign_self_links_never_leave_the_api_host() {
	let server = MockServer::start_async().await;
	let foreign = MockServer::start_async().await;
	let client = client(&server);
	let token = bearer(&client, "t", None);
	let api = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/foo")
				.query_param("page", "2")
				.header("authorization", "Bearer t");
			then.status(200).json_body(json!({ "ok": true }));
		})
		.await;
	let leaked = foreign
		.mock_async(|when, then| {
			when.path("/foo");
			then.status(200).json_body(json!({ "ok": false }));
		})
		.await;
	let resource = json!({ "_links": { "self": { "href": foreign.url("/foo?page=2") } } });
	let response = token.get(&resource).await.expect("Foreign self links should be rebased.");

	assert_eq!(response.body(), Some(&json!({ "ok": true })));

	api.assert_calls_async(1).await;
	leaked.assert_calls_async(0).await;
}

#[tokio::test]
async fn query_body_and_caller_headers_are_sent() {
	let server = MockServer::start_async().await;
	let client = client(&server);
	let token = bearer(&client, "t", None);
	let search = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/customers")
				.query_param("limit", "10")
				.query_param("search", "jane doe")
				.header("accept", "application/json");
			then.status(200).json_body(json!({ "total": 1 }));
		})
		.await;
	let update = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/customers/123")
				.header("content-type", "application/json")
				.header("idempotency-key", "key-1")
				.json_body(json!({ "email": "jane@example.com" }));
			then.status(200).json_body(json!({ "id": "123" }));
		})
		.await;
	let request = ApiRequest::get("customers")
		.query([("limit", "10"), ("search", "jane doe")])
		.header(ACCEPT, HeaderValue::from_static("application/json"));

	token.execute(request).await.expect("Search should succeed.");

	let request = ApiRequest::post("/customers/123")
		.body(json!({ "email": "jane@example.com" }))
		.header(
			"idempotency-key".parse().expect("Static header name should parse."),
			HeaderValue::from_static("key-1"),
		);

	token.execute(request).await.expect("Update should succeed.");

	search.assert_async().await;
	update.assert_async().await;
}

#[tokio::test]
async fn empty_success_bodies_decode_to_none() {
	let server = MockServer::start_async().await;
	let client = client(&server);
	let token = bearer(&client, "t", None);
	let _mock = server
		.mock_async(|when, then| {
			when.method(DELETE).path("/funding-sources/abc");
			then.status(200);
		})
		.await;
	let response = token.delete("funding-sources/abc").await.expect("DELETE should succeed.");

	assert!(response.body().is_none());
}

#[tokio::test]
async fn vendor_errors_are_classified() {
	let server = MockServer::start_async().await;
	let client = client(&server);
	let token = bearer(&client, "t", None);
	let _missing = server
		.mock_async(|when, then| {
			when.method(GET).path("/customers/missing");
			then.status(404).json_body(json!({
				"code": "NotFound",
				"message": "The requested resource was not found."
			}));
		})
		.await;
	let _invalid = server
		.mock_async(|when, then| {
			when.method(POST).path("/customers");
			then.status(400).json_body(json!({
				"code": "ValidationError",
				"message": "Validation error(s) present.",
				"_embedded": {
					"errors": [
						{
							"code": "Required",
							"message": "FirstName required.",
							"path": "/firstName"
						}
					]
				}
			}));
		})
		.await;
	let _outage = server
		.mock_async(|when, then| {
			when.method(GET).path("/outage");
			then.status(502).body("<html>Bad Gateway</html>");
		})
		.await;
	let err = token.get("customers/missing").await.expect_err("404 should fail.");
	let api = err.api().expect("Vendor errors should be classified.");

	assert_eq!(api.kind(), ApiErrorKind::NotFound);
	assert_eq!(api.status(), Some(404));
	assert_eq!(api.message(), Some("The requested resource was not found."));

	let err = token.post("customers", json!({})).await.expect_err("400 should fail.");
	let api = err.api().expect("Validation errors should be classified.");

	assert_eq!(api.kind(), ApiErrorKind::ValidationError);
	assert_eq!(api.violations().len(), 1);
	assert_eq!(api.violations()[0].field.as_deref(), Some("/firstName"));

	let err = token.get("outage").await.expect_err("502 should fail.");
	let Some(ApiError::Http { status, body_preview: Some(preview) }) = err.api() else {
		panic!("Non-JSON failures should fall back to the HTTP variant.");
	};

	assert_eq!(*status, 502);
	assert!(preview.contains("Bad Gateway"));
}

#[tokio::test]
async fn expired_token_without_refresh_token_is_propagated() {
	let server = MockServer::start_async().await;
	let client = client(&server);
	let token = bearer(&client, "t", None);
	let api = server
		.mock_async(|when, then| {
			when.method(GET).path("/accounts/1");
			then.status(401).json_body(json!({ "code": "ExpiredAccessToken" }));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).json_body(json!({ "access_token": "never" }));
		})
		.await;
	let err = token.get("accounts/1").await.expect_err("Expired tokens should fail.");

	assert!(err.api().is_some_and(ApiError::is_expired_access_token));

	api.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;
}

#[tokio::test]
async fn retry_happens_at_most_once() {
	let server = MockServer::start_async().await;
	let grants = GrantLog::default();
	let client = grants.attach(builder(&server)).build().expect("Client should build.");
	let token = bearer(&client, "access-old", Some("refresh-old"));
	let old = server
		.mock_async(|when, then| {
			when.method(GET).path("/accounts/1").header("authorization", "Bearer access-old");
			then.status(401).json_body(json!({ "code": "ExpiredAccessToken" }));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.form_urlencoded_tuple("grant_type", "refresh_token")
				.form_urlencoded_tuple("refresh_token", "refresh-old");
			then.status(200)
				.json_body(json!({ "access_token": "access-new", "refresh_token": "refresh-new" }));
		})
		.await;
	let new = server
		.mock_async(|when, then| {
			when.method(GET).path("/accounts/1").header("authorization", "Bearer access-new");
			then.status(401).json_body(json!({ "code": "ExpiredAccessToken" }));
		})
		.await;
	let err = token.get("accounts/1").await.expect_err("Second failure should propagate.");

	assert_eq!(err.api().map(ApiError::kind), Some(ApiErrorKind::ExpiredAccessToken));

	old.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;
	new.assert_calls_async(1).await;

	assert_eq!(grants.last().as_deref(), Some("access-new"));
	assert!(client.cached_token().await.is_none(), "Only a cached token is rotated.");
}

#[tokio::test]
async fn failed_refresh_surfaces_the_token_endpoint_error() {
	let server = MockServer::start_async().await;
	let client = client(&server);
	let token = bearer(&client, "access-old", Some("refresh-revoked"));
	let _api = server
		.mock_async(|when, then| {
			when.method(GET).path("/accounts/1");
			then.status(401).json_body(json!({ "code": "ExpiredAccessToken" }));
		})
		.await;
	let _refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(400).json_body(json!({ "error": "invalid_grant" }));
		})
		.await;
	let err = token.get("accounts/1").await.expect_err("Revoked refresh tokens should fail.");

	assert!(matches!(err, Error::Api(ApiError::InvalidGrant(_))));
}

#[tokio::test]
async fn in_parallel_keeps_request_order() {
	let server = MockServer::start_async().await;
	let client = client(&server);
	let token = bearer(&client, "t", None);

	for (path, total) in [("/a", 1), ("/b", 2)] {
		server
			.mock_async(move |when, then| {
				when.method(GET).path(path);
				then.status(200).json_body(json!({ "total": total }));
			})
			.await;
	}

	let results = token
		.in_parallel([ApiRequest::get("a"), ApiRequest::get("missing"), ApiRequest::get("b")])
		.await;

	assert_eq!(results.len(), 3);
	assert_eq!(
		results[0].as_ref().expect("First request should succeed.").body(),
		Some(&json!({ "total": 1 }))
	);
	assert!(results[1].is_err());
	assert_eq!(
		results[2].as_ref().expect("Third request should succeed.").body(),
		Some(&json!({ "total": 2 }))
	);
}

#[tokio::test]
async fn stale_copies_reuse_a_settled_refresh() {
	let server = MockServer::start_async().await;
	let client = client(&server);
	let first = bearer(&client, "access-old", Some("refresh-old"));
	let second = bearer(&client, "access-old", Some("refresh-old"));
	let _expired = server
		.mock_async(|when, then| {
			when.method(GET).path("/accounts/1").header("authorization", "Bearer access-old");
			then.status(401).json_body(json!({ "code": "ExpiredAccessToken" }));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/token").form_urlencoded_tuple("refresh_token", "refresh-old");
			then.status(200)
				.json_body(json!({ "access_token": "access-new", "refresh_token": "refresh-new" }));
		})
		.await;
	let retried = server
		.mock_async(|when, then| {
			when.method(GET).path("/accounts/1").header("authorization", "Bearer access-new");
			then.status(200).json_body(json!({ "id": "1" }));
		})
		.await;

	first.get("accounts/1").await.expect("The first copy should refresh and retry.");
	second.get("accounts/1").await.expect("The second copy should reuse the refreshed token.");

	refresh.assert_calls_async(1).await;
	retried.assert_calls_async(2).await;
}
