//! In-process backends and a scripted payment sheet for SDK tests

use std::{
    collections::{BTreeSet, VecDeque},
    convert::Infallible,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Json, Router,
    http::StatusCode,
    response::sse::{Event, Sse},
    routing::{get, post},
};
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use tokio::{net::TcpListener, sync::oneshot};

use crate::{
    controller::{PaymentSheet, PaymentSummary, SheetRequest, SheetResult},
    types::CardNetwork,
};

/// Serve `router` on an ephemeral local port and return its base URL
pub async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Base URL of a port nothing listens on
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Request bodies received by a mock backend
#[derive(Clone, Default)]
pub struct Recorded(Arc<Mutex<Vec<JsonValue>>>);

impl Recorded {
    pub fn requests(&self) -> Vec<JsonValue> {
        self.0.lock().clone()
    }
}

/// Payment-intent backend answering every request with `status` and `body`
pub fn intent_backend(status: StatusCode, body: impl Into<String>) -> (Router, Recorded) {
    let recorded = Recorded::default();
    let body = body.into();

    let handler = {
        let recorded = recorded.clone();
        move |Json(payload): Json<JsonValue>| {
            let recorded = recorded.clone();
            let body = body.clone();
            async move {
                recorded.0.lock().push(payload);
                (status, body)
            }
        }
    };

    let router = Router::new()
        .route("/create-payment-intent", post(handler.clone()))
        .route("/update-payment-sheet", post(handler));

    (router, recorded)
}

/// Backend that answers only after `delay`
pub fn slow_backend(delay: Duration) -> (Router, Recorded) {
    let router = Router::new().route(
        "/create-payment-intent",
        post(move || async move {
            tokio::time::sleep(delay).await;
            (StatusCode::OK, r#"{"clientSecret":"secret_late"}"#)
        }),
    );
    (router, Recorded::default())
}

/// Document store streaming `snapshots` for any document
///
/// With `hold_open`, the stream stays open after the last snapshot instead of
/// ending.
pub fn document_backend(snapshots: Vec<JsonValue>, hold_open: bool) -> Router {
    Router::new().route(
        "/v1/documents/{*path}",
        get(move || {
            let snapshots = snapshots.clone();
            async move {
                let events = futures::stream::iter(snapshots.into_iter().map(|snapshot| {
                    Ok::<_, Infallible>(Event::default().data(snapshot.to_string()))
                }));
                let stream = if hold_open {
                    events.chain(futures::stream::pending()).boxed()
                } else {
                    events.boxed()
                };
                Sse::new(stream)
            }
        }),
    )
}

/// What the scripted sheet was last asked to present
#[derive(Debug, Clone)]
pub struct PresentedRequest {
    pub client_secret: String,
    pub merchant_identifier: String,
    pub summary: Option<PaymentSummary>,
}

/// Payment sheet replaying queued results
///
/// With an empty queue the user authorizes.
#[derive(Default)]
pub struct ScriptedSheet {
    results: Mutex<VecDeque<oneshot::Receiver<SheetResult>>>,
    presented: AtomicUsize,
    last_request: Mutex<Option<PresentedRequest>>,
    unavailable: bool,
}

impl ScriptedSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sheet on a device without a usable payment method
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Queue a result delivered as soon as the sheet is presented
    pub fn push(&self, result: SheetResult) {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        self.results.lock().push_back(rx);
    }

    /// Queue a result the test delivers later
    pub fn push_pending(&self) -> oneshot::Sender<SheetResult> {
        let (tx, rx) = oneshot::channel();
        self.results.lock().push_back(rx);
        tx
    }

    /// Number of presentations so far
    pub fn presented(&self) -> usize {
        self.presented.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<PresentedRequest> {
        self.last_request.lock().clone()
    }
}

impl PaymentSheet for ScriptedSheet {
    fn can_make_payments(&self, _networks: &BTreeSet<CardNetwork>) -> bool {
        !self.unavailable
    }

    async fn present(&self, request: SheetRequest<'_>) -> SheetResult {
        self.presented.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock() = Some(PresentedRequest {
            client_secret: request.client_secret.expose_secret().to_string(),
            merchant_identifier: request.merchant.merchant_identifier.clone(),
            summary: request.summary.cloned(),
        });

        let next = self.results.lock().pop_front();
        match next {
            Some(rx) => rx.await.unwrap_or(SheetResult::Canceled),
            None => SheetResult::Completed,
        }
    }
}
