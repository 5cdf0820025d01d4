//! Minimal HTTP stand-in for a remote inference provider
//!
//! Every request is recorded and answered with the configured reply, whatever
//! the path, so one stub serves both the OpenAI and the Gemini wire formats.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
	body::Bytes,
	extract::State,
	http::{header, HeaderMap, StatusCode, Uri},
	response::{IntoResponse, Response},
	Router,
};
use nutriscan::serde_json::Value;
use tokio::task::JoinHandle;

/// What the stub answers with
#[derive(Debug, Clone)]
pub struct StubReply {
	pub status: u16,
	pub body: String,
	pub delay_ms: u64,
}

impl StubReply {
	#[allow(dead_code)]
	pub fn json(body: Value) -> Self {
		Self {
			status: 200,
			body: body.to_string(),
			delay_ms: 0,
		}
	}

	#[allow(dead_code)]
	pub fn status(status: u16, body: &str) -> Self {
		Self {
			status,
			body: body.to_string(),
			delay_ms: 0,
		}
	}

	#[allow(dead_code)]
	pub fn delayed(mut self, delay_ms: u64) -> Self {
		self.delay_ms = delay_ms;
		self
	}
}

/// One request as seen by the stub
#[derive(Debug, Clone)]
pub struct RecordedRequest {
	pub path: String,
	/// Header names lowercased
	pub headers: HashMap<String, String>,
	pub body: Value,
}

#[derive(Clone)]
struct StubState {
	reply: StubReply,
	requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

pub struct StubProvider {
	pub base_url: String,
	requests: Arc<Mutex<Vec<RecordedRequest>>>,
	handle: JoinHandle<()>,
}

impl StubProvider {
	pub async fn spawn(reply: StubReply) -> Self {
		let requests = Arc::new(Mutex::new(Vec::new()));
		let state = StubState {
			reply,
			requests: Arc::clone(&requests),
		};
		let app = Router::new().fallback(handle_request).with_state(state);

		let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
			.await
			.expect("bind stub port");
		let addr = listener.local_addr().unwrap();
		let base_url = format!("http://{}:{}", addr.ip(), addr.port());

		let handle = tokio::spawn(async move {
			let _ = axum::serve(listener, app).await;
		});

		// Give server time to start
		tokio::time::sleep(Duration::from_millis(10)).await;

		Self {
			base_url,
			requests,
			handle,
		}
	}

	pub fn requests(&self) -> Vec<RecordedRequest> {
		self.requests.lock().unwrap().clone()
	}

	#[allow(dead_code)]
	pub fn request_count(&self) -> usize {
		self.requests.lock().unwrap().len()
	}
}

impl Drop for StubProvider {
	fn drop(&mut self) {
		self.handle.abort();
	}
}

async fn handle_request(
	State(state): State<StubState>,
	uri: Uri,
	headers: HeaderMap,
	body: Bytes,
) -> Response {
	let recorded = RecordedRequest {
		path: uri.path().to_string(),
		headers: headers
			.iter()
			.filter_map(|(name, value)| {
				value
					.to_str()
					.ok()
					.map(|v| (name.as_str().to_lowercase(), v.to_string()))
			})
			.collect(),
		body: nutriscan::serde_json::from_slice(&body).unwrap_or(Value::Null),
	};
	state.requests.lock().unwrap().push(recorded);

	if state.reply.delay_ms > 0 {
		tokio::time::sleep(Duration::from_millis(state.reply.delay_ms)).await;
	}

	let status = StatusCode::from_u16(state.reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
	(
		status,
		[(header::CONTENT_TYPE, "application/json")],
		state.reply.body.clone(),
	)
		.into_response()
}
