use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use futures::{Stream, StreamExt};
use parking_lot::RwLock;
use reqwest_eventsource::{Event as SseEvent, EventSource, retry::Never};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
    error::PaymentError,
    types::{BalanceSnapshot, ConnectionState, DocumentPath, DocumentStoreConfig},
};

/// Snapshot of a document as pushed by the document store
#[derive(Debug, Deserialize)]
struct DocumentSnapshot {
    #[serde(default = "document_exists")]
    exists: bool,

    #[serde(default)]
    data: serde_json::Map<String, JsonValue>,
}

fn document_exists() -> bool {
    true
}

/// Subscribes to a balance field of documents in the remote document store
///
/// Each subscription follows one document over SSE and yields a
/// [`BalanceSnapshot`] per change, in delivery order. There is no implicit
/// reconnection: when the connection fails or the store closes it, the
/// stream ends and the caller must subscribe again.
///
/// # Example
///
/// ```ignore
/// use futures::StreamExt;
/// use onepay_sdk::{BalanceSubscription, DocumentStoreConfig};
///
/// let config = DocumentStoreConfig::parse("https://docs.example.com")?;
/// let subscription = BalanceSubscription::new(config);
///
/// let mut balances = subscription.subscribe(subscription.document_path("user-42")?);
/// while let Some(snapshot) = balances.next().await {
///     println!("Balance: {}", snapshot.value);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct BalanceSubscription {
    /// Configuration
    config: DocumentStoreConfig,

    /// HTTP client for SSE connections
    http_client: reqwest::Client,
}

impl BalanceSubscription {
    pub fn new(config: DocumentStoreConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &DocumentStoreConfig {
        &self.config
    }

    /// Path of `document_id` in the configured collection
    pub fn document_path(&self, document_id: &str) -> crate::Result<DocumentPath> {
        self.config.document_path(document_id)
    }

    /// Build the listen URL for a document
    ///
    /// Each path segment is percent-encoded on its own, so reserved
    /// characters in document ids stay part of the id.
    fn build_url(&self, path: &DocumentPath) -> crate::Result<Url> {
        let mut url = self.config.endpoint.clone();
        let (last, parents) = path
            .segments()
            .split_last()
            .ok_or_else(|| PaymentError::Subscription(format!("Empty document path {}", path)))?;

        url.path_segments_mut()
            .map_err(|_| {
                PaymentError::Config(format!(
                    "Document store URL {} cannot take a path",
                    self.config.endpoint
                ))
            })?
            .pop_if_empty()
            .extend(["v1", "documents"])
            .extend(parents)
            .push(&format!("{}:listen", last));

        Ok(url)
    }

    /// Follow the balance field of the document at `path`
    ///
    /// Nothing is sent until the returned stream is first polled. If no
    /// listen URL can be built for `path`, the stream is already finished
    /// and [`BalanceStream::last_error`] says why.
    pub fn subscribe(&self, path: DocumentPath) -> BalanceStream {
        let state = Arc::new(RwLock::new(ConnectionState::Disconnected));
        let last_error = Arc::new(RwLock::new(None));

        let url = match self.build_url(&path) {
            Ok(url) => url,
            Err(e) => {
                error!(path = %path, error = %e, "Cannot subscribe to document");
                *last_error.write() = Some(e.to_string());
                return BalanceStream {
                    path,
                    inner: None,
                    state,
                    last_error,
                };
            }
        };

        let mut request = self.http_client.get(url);
        if let Some(ref token) = self.config.token {
            request = request.bearer_auth(token);
        }

        let snapshots = snapshot_stream(
            request,
            path.clone(),
            self.config.field.clone(),
            Arc::clone(&state),
            Arc::clone(&last_error),
        );

        BalanceStream {
            path,
            inner: Some(snapshots.boxed()),
            state,
            last_error,
        }
    }
}

/// Stream of balance snapshots for one document
///
/// Lazy, unbounded and not restartable. Once it returns `None`, it stays
/// finished.
pub struct BalanceStream {
    /// Watched document
    path: DocumentPath,

    /// Live snapshot stream, dropped once finished or unsubscribed
    inner: Option<Pin<Box<dyn Stream<Item = BalanceSnapshot> + Send>>>,

    /// Connection state
    state: Arc<RwLock<ConnectionState>>,

    /// Why the stream ended, if it failed
    last_error: Arc<RwLock<Option<String>>>,
}

impl BalanceStream {
    pub fn path(&self) -> &DocumentPath {
        &self.path
    }

    /// Get the current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Error that ended the stream, if any
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.inner.is_none()
    }

    /// Stop following the document
    ///
    /// Closes the connection; the stream yields `None` from now on.
    pub fn unsubscribe(&mut self) {
        if self.inner.take().is_some() {
            *self.state.write() = ConnectionState::Disconnected;
            info!(path = %self.path, "Unsubscribed from document");
        }
    }
}

impl Stream for BalanceStream {
    type Item = BalanceSnapshot;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let Some(inner) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };

        match inner.as_mut().poll_next(cx) {
            Poll::Ready(None) => {
                this.inner = None;
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

/// Extract the balance field from an SSE message
///
/// Returns `Ok(None)` when the document does not exist or the field is not
/// an integer.
fn parse_balance(data: &str, field: &str) -> Result<Option<i64>, serde_json::Error> {
    let snapshot: DocumentSnapshot = serde_json::from_str(data)?;
    if !snapshot.exists {
        return Ok(None);
    }
    Ok(snapshot.data.get(field).and_then(JsonValue::as_i64))
}

fn snapshot_stream(
    request: reqwest::RequestBuilder,
    path: DocumentPath,
    field: String,
    state: Arc<RwLock<ConnectionState>>,
    last_error: Arc<RwLock<Option<String>>>,
) -> impl Stream<Item = BalanceSnapshot> + Send {
    async_stream::stream! {
        *state.write() = ConnectionState::Connecting;
        info!(path = %path, "Subscribing to document");

        let mut es = match EventSource::new(request) {
            Ok(es) => es,
            Err(e) => {
                error!(path = %path, error = %e, "Failed to create EventSource");
                *last_error.write() = Some(e.to_string());
                *state.write() = ConnectionState::Disconnected;
                return;
            }
        };
        es.set_retry_policy(Box::new(Never));

        while let Some(event) = es.next().await {
            match event {
                Ok(SseEvent::Open) => {
                    *state.write() = ConnectionState::Connected;
                    debug!(path = %path, "Document stream opened");
                }
                Ok(SseEvent::Message(msg)) => match parse_balance(&msg.data, &field) {
                    Ok(Some(value)) => {
                        debug!(path = %path, value, "Received balance");
                        yield BalanceSnapshot::new(value);
                    }
                    Ok(None) => {
                        warn!(
                            path = %path,
                            field = %field,
                            "Document does not exist or has no integer balance, skipping"
                        );
                    }
                    Err(e) => {
                        warn!(path = %path, error = %e, "Failed to parse document snapshot");
                    }
                },
                Err(reqwest_eventsource::Error::StreamEnded) => {
                    info!(path = %path, "Document stream ended");
                    break;
                }
                Err(e) => {
                    error!(path = %path, error = %e, "Document stream error");
                    *last_error.write() = Some(e.to_string());
                    break;
                }
            }
        }

        es.close();
        *state.write() = ConnectionState::Disconnected;
    }
}
