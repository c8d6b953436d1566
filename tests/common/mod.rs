#![allow(dead_code)]

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use httpmock::MockServer;
use parking_lot::Mutex;
// self
use dwolla_v2::{Client, ClientBuilder, Endpoints, Token};

pub const CLIENT_ID: &str = "key";
pub const CLIENT_SECRET: &str = "secret";
/// `Basic base64("key:secret")`.
pub const BASIC_AUTH: &str = "Basic a2V5OnNlY3JldA==";
pub const MEDIA_TYPE: &str = "application/vnd.dwolla.v1.hal+json";

/// URL triple pointing every endpoint at `server`.
pub fn endpoints(server: &MockServer) -> Endpoints {
	Endpoints::new(server.url("/auth"), server.url("/token"), server.base_url())
}

/// Client builder with test credentials routed to `server`.
pub fn builder(server: &MockServer) -> ClientBuilder {
	Client::builder().id(CLIENT_ID).secret(CLIENT_SECRET).endpoints(endpoints(server))
}

pub fn client(server: &MockServer) -> Client {
	builder(server).build().expect("Mock-backed client should build.")
}

/// Counts and records every token passed to an on-grant callback.
#[derive(Clone, Default)]
pub struct GrantLog {
	calls: Arc<AtomicUsize>,
	last: Arc<Mutex<Option<String>>>,
}
impl GrantLog {
	pub fn attach(&self, builder: ClientBuilder) -> ClientBuilder {
		let log = self.clone();

		builder.on_grant(move |token: &Token| {
			log.calls.fetch_add(1, Ordering::SeqCst);
			*log.last.lock() = Some(token.access_token().expose().to_owned());
		})
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn last(&self) -> Option<String> {
		self.last.lock().clone()
	}
}

