//! Incoming-webhook notifier.
//!
//! Posts each alert as a Slack-compatible JSON message (`text` plus one
//! mrkdwn section block) over HTTP/1.1, wrapped in TLS for `https://`
//! endpoints. One connection per alert; alerts are rare.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HOST, USER_AGENT};
use http::{Method, Request, Uri};
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use serde_json::json;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio_rustls::TlsConnector;
use tracing::debug;

use logwatch_engine::{Alert, Notifier, NotifyError};

/// Parsed webhook target.
#[derive(Debug, Clone)]
struct Endpoint {
    host: String,
    port: u16,
    /// Value for the `Host` header.
    authority: String,
    path_and_query: String,
    tls: bool,
}

impl Endpoint {
    fn parse(url: &str) -> Result<Self, NotifyError> {
        let uri: Uri = url
            .parse()
            .map_err(|e| NotifyError::Endpoint(format!("{url}: {e}")))?;

        let tls = match uri.scheme_str() {
            Some("https") => true,
            Some("http") => false,
            Some(other) => {
                return Err(NotifyError::Endpoint(format!("unsupported scheme {other}")));
            }
            None => return Err(NotifyError::Endpoint(format!("{url}: missing scheme"))),
        };

        let host = uri
            .host()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| NotifyError::Endpoint(format!("{url}: missing host")))?
            .to_string();
        let authority = match uri.port_u16() {
            Some(port) => format!("{host}:{port}"),
            None => host.clone(),
        };
        let port = uri.port_u16().unwrap_or(if tls { 443 } else { 80 });
        let path_and_query = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        Ok(Self {
            // IPv6 literals come bracketed; sockets want them bare.
            host: host.trim_start_matches('[').trim_end_matches(']').to_string(),
            port,
            authority,
            path_and_query,
            tls,
        })
    }
}

/// Build a TLS client config trusting the Mozilla root store.
fn client_tls_config() -> Result<Arc<rustls::ClientConfig>, NotifyError> {
    let mut root_store = rustls::RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = rustls::ClientConfig::builder_with_provider(
        rustls::crypto::ring::default_provider().into(),
    )
    .with_safe_default_protocol_versions()
    .map_err(|e| NotifyError::Transport(format!("tls protocol version error: {e}")))?
    .with_root_certificates(root_store)
    .with_no_client_auth();

    Ok(Arc::new(config))
}

/// The JSON body posted for an alert.
pub fn webhook_payload(alert: &Alert) -> serde_json::Value {
    let text = alert.render();
    json!({
        "text": text,
        "blocks": [
            {
                "type": "section",
                "text": { "type": "mrkdwn", "text": text }
            }
        ]
    })
}

/// Delivers alerts to an incoming-webhook URL.
pub struct WebhookNotifier {
    endpoint: Endpoint,
    tls: Option<Arc<rustls::ClientConfig>>,
    timeout: Duration,
    runtime: Handle,
}

impl std::fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The path of a webhook URL is its credential; keep it out of logs.
        f.debug_struct("WebhookNotifier")
            .field("authority", &self.endpoint.authority)
            .field("tls", &self.endpoint.tls)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl WebhookNotifier {
    /// Create a notifier for `url`.
    ///
    /// `runtime` drives the HTTP exchange when [`Notifier::send`] is called
    /// from a thread outside the runtime.
    pub fn new(url: &str, timeout: Duration, runtime: Handle) -> Result<Self, NotifyError> {
        let endpoint = Endpoint::parse(url)?;
        let tls = if endpoint.tls {
            Some(client_tls_config()?)
        } else {
            None
        };
        Ok(Self {
            endpoint,
            tls,
            timeout,
            runtime,
        })
    }

    /// `host[:port]` of the endpoint.
    pub fn authority(&self) -> &str {
        &self.endpoint.authority
    }

    /// Post one alert, bounded by the configured timeout.
    pub async fn post(&self, alert: &Alert) -> Result<(), NotifyError> {
        match tokio::time::timeout(self.timeout, self.deliver(alert)).await {
            Ok(result) => result,
            Err(_) => Err(NotifyError::Timeout(self.timeout)),
        }
    }

    async fn deliver(&self, alert: &Alert) -> Result<(), NotifyError> {
        let body = serde_json::to_vec(&webhook_payload(alert))
            .map_err(|e| NotifyError::Transport(format!("encode payload: {e}")))?;

        let tcp = TcpStream::connect((self.endpoint.host.as_str(), self.endpoint.port))
            .await
            .map_err(|e| {
                NotifyError::Transport(format!("connect {}: {e}", self.endpoint.authority))
            })?;

        match &self.tls {
            Some(tls) => {
                let server_name = ServerName::try_from(self.endpoint.host.clone())
                    .map_err(|e| NotifyError::Endpoint(format!("invalid server name: {e}")))?;
                let stream = TlsConnector::from(tls.clone())
                    .connect(server_name, tcp)
                    .await
                    .map_err(|e| NotifyError::Transport(format!("tls handshake: {e}")))?;
                self.exchange(stream, body).await
            }
            None => self.exchange(tcp, body).await,
        }
    }

    async fn exchange<S>(&self, stream: S, body: Vec<u8>) -> Result<(), NotifyError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
            .await
            .map_err(|e| NotifyError::Transport(format!("http handshake: {e}")))?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(error = %e, "webhook connection closed with error");
            }
        });

        let req = Request::builder()
            .method(Method::POST)
            .uri(self.endpoint.path_and_query.as_str())
            .header(HOST, self.endpoint.authority.as_str())
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, "logwatch/0.1")
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| NotifyError::Transport(format!("build request: {e}")))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| NotifyError::Transport(format!("send request: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            debug!(%status, authority = %self.endpoint.authority, "webhook accepted alert");
            return Ok(());
        }

        let body = match resp.into_body().collect().await {
            Ok(collected) => String::from_utf8_lossy(&collected.to_bytes()).into_owned(),
            Err(_) => String::new(),
        };
        Err(NotifyError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

impl Notifier for WebhookNotifier {
    /// Blocks the calling thread on the runtime handle. Must not be called
    /// from inside an async task.
    fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        self.runtime.block_on(self.post(alert))
    }
}
