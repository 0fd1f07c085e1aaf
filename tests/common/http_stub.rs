use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// A request as the stub received it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub headers: HeaderMap,
    pub body: Value,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

type Responder = dyn Fn(&RecordedRequest) -> (StatusCode, Value) + Send + Sync;

struct StubState {
    requests: Mutex<Vec<RecordedRequest>>,
    responder: Box<Responder>,
}

/// Local HTTP server answering every path with JSON from a responder
pub struct HttpStub {
    pub url: String,
    state: Arc<StubState>,
}

impl HttpStub {
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&RecordedRequest) -> (StatusCode, Value) + Send + Sync + 'static,
    {
        let state = Arc::new(StubState {
            requests: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        });
        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub listener");
        let addr = listener.local_addr().expect("stub listener addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("stub server run");
        });

        HttpStub {
            url: format!("http://{}", addr),
            state,
        }
    }

    /// Answer every request with the same status and body
    pub async fn fixed(status: StatusCode, body: Value) -> Self {
        Self::start(move |_| (status, body.clone())).await
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }
}

async fn handle(
    State(state): State<Arc<StubState>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = RecordedRequest {
        path: uri.path().to_string(),
        headers,
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    };

    let (status, reply) = (state.responder)(&request);
    state.requests.lock().unwrap().push(request);

    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        reply.to_string(),
    )
        .into_response()
}
