//! LND REST gateway adapter.
//!
//! Talks to `lnd`'s REST proxy (default port 8080). Unary calls share a
//! client with a request timeout; the graph subscription uses a separate
//! client without one, since the response body is an open-ended stream of
//! newline-delimited JSON frames.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use bytes::{Buf, BytesMut};
use futures::StreamExt;
use lnroute_core::{ChannelId, Edge};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::client::{GraphUpdateStream, LightningClient, LocalChannel, NodeInfo};
use crate::error::ClientError;
use crate::events::GraphTopologyUpdate;

/// Header LND's REST proxy reads the macaroon from.
const MACAROON_HEADER: &str = "Grpc-Metadata-macaroon";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for [`LndRestClient`].
#[derive(Debug, Clone)]
pub struct LndRestConfig {
    /// Base URL, e.g. `https://localhost:8080`.
    pub url: String,
    /// Hex-encoded macaroon.
    pub macaroon_hex: Option<String>,
    /// PEM bytes of lnd's `tls.cert`.
    pub tls_cert_pem: Option<Vec<u8>>,
    /// Timeout for unary requests.
    pub request_timeout: Duration,
    /// Timeout for establishing a connection, unary and streaming alike.
    pub connect_timeout: Duration,
    /// Skip certificate verification entirely.
    pub accept_invalid_certs: bool,
}

impl LndRestConfig {
    /// Build a config from operator-supplied credential strings. Each of
    /// `macaroon` and `tls_cert` may be a file path or the file contents
    /// encoded as base64.
    pub fn from_sources(
        url: impl Into<String>,
        macaroon: Option<&str>,
        tls_cert: Option<&str>,
        request_timeout: Duration,
    ) -> Result<Self, ClientError> {
        let macaroon_hex = macaroon
            .map(|m| read_path_or_base64(m, "macaroon").map(hex::encode))
            .transpose()?;
        let tls_cert_pem = tls_cert
            .map(|c| read_path_or_base64(c, "tls cert"))
            .transpose()?;
        Ok(Self {
            url: url.into(),
            macaroon_hex,
            tls_cert_pem,
            request_timeout,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            accept_invalid_certs: false,
        })
    }
}

/// Interpret `value` as a path first, then as base64.
fn read_path_or_base64(value: &str, what: &str) -> Result<Vec<u8>, ClientError> {
    let path = Path::new(value);
    if path.is_file() {
        return std::fs::read(path)
            .map_err(|e| ClientError::Config(format!("reading {} {}: {}", what, value, e)));
    }
    base64::engine::general_purpose::STANDARD
        .decode(value.trim())
        .map_err(|_| {
            ClientError::Config(format!("{} is neither a readable file nor base64", what))
        })
}

#[derive(Deserialize)]
struct GraphResponse {
    #[serde(default)]
    edges: Vec<Edge>,
}

#[derive(Deserialize)]
struct ChannelsResponse {
    #[serde(default)]
    channels: Vec<LocalChannel>,
}

/// One line of a streaming response.
#[derive(Deserialize)]
struct StreamFrame {
    result: Option<GraphTopologyUpdate>,
    error: Option<serde_json::Value>,
}

/// LND node reached through its REST gateway.
pub struct LndRestClient {
    base_url: String,
    unary: reqwest::Client,
    streaming: reqwest::Client,
}

impl LndRestClient {
    pub fn new(config: LndRestConfig) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        if let Some(ref mac) = config.macaroon_hex {
            let value = HeaderValue::from_str(mac)
                .map_err(|e| ClientError::Config(format!("macaroon header: {}", e)))?;
            headers.insert(MACAROON_HEADER, value);
        }

        let builder = |timeout: Option<Duration>| -> Result<reqwest::Client, ClientError> {
            let mut b = reqwest::Client::builder()
                .default_headers(headers.clone())
                .connect_timeout(config.connect_timeout)
                .danger_accept_invalid_certs(config.accept_invalid_certs);
            if let Some(ref pem) = config.tls_cert_pem {
                let cert = reqwest::Certificate::from_pem(pem)
                    .map_err(|e| ClientError::Config(format!("tls cert: {}", e)))?;
                b = b.add_root_certificate(cert);
            }
            if let Some(t) = timeout {
                b = b.timeout(t);
            }
            b.build()
                .map_err(|e| ClientError::Config(format!("http client: {}", e)))
        };

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            unary: builder(Some(config.request_timeout))?,
            // no overall timeout: the subscription is meant to stay open
            streaming: builder(None)?,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let resp = self.unary.get(self.url(path)).send().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::Transport(format!("GET {} timed out", path))
            } else {
                ClientError::from(e)
            }
        })?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        resp.json::<T>().await.map_err(ClientError::from)
    }
}

#[async_trait]
impl LightningClient for LndRestClient {
    async fn get_info(&self) -> Result<NodeInfo, ClientError> {
        self.get_json("/v1/getinfo").await
    }

    async fn describe_graph(&self) -> Result<Vec<Edge>, ClientError> {
        let graph: GraphResponse = self.get_json("/v1/graph").await?;
        Ok(graph.edges)
    }

    async fn get_chan_info(&self, chan_id: ChannelId) -> Result<Edge, ClientError> {
        match self.get_json(&format!("/v1/graph/edge/{}", chan_id)).await {
            // lnd answers an unknown edge with a 404 or a 500 "edge not found"
            Err(ClientError::Status { status, body })
                if status == 404 || body.contains("edge not found") =>
            {
                Err(ClientError::ChannelNotFound(chan_id))
            }
            other => other,
        }
    }

    async fn subscribe_graph(&self) -> Result<GraphUpdateStream, ClientError> {
        let resp = self
            .streaming
            .get(self.url("/v1/graph/subscribe"))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        tracing::debug!("lnd graph subscription opened");

        let mut body = resp.bytes_stream();
        let stream = async_stream::stream! {
            let mut buf = BytesMut::new();
            while let Some(chunk) = body.next().await {
                match chunk {
                    Ok(bytes) => buf.extend_from_slice(&bytes),
                    Err(e) => {
                        yield Err(ClientError::from(e));
                        return;
                    }
                }
                while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                    let line = buf.split_to(pos + 1);
                    match decode_frame(&line) {
                        Ok(Some(update)) => yield Ok(update),
                        Ok(None) => {}
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }
            if buf.has_remaining() {
                if let Ok(Some(update)) = decode_frame(&buf) {
                    yield Ok(update);
                }
            }
        };
        Ok(Box::pin(stream))
    }

    async fn list_channels(&self) -> Result<Vec<LocalChannel>, ClientError> {
        let resp: ChannelsResponse = self.get_json("/v1/channels").await?;
        Ok(resp.channels)
    }

    fn backend_name(&self) -> &str {
        "lnd-rest"
    }
}

/// Decode one NDJSON frame. Blank lines yield `None`; an `error` frame
/// becomes a transport error since lnd closes the stream after it.
fn decode_frame(line: &[u8]) -> Result<Option<GraphTopologyUpdate>, ClientError> {
    let trimmed = line.trim_ascii();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let frame: StreamFrame =
        serde_json::from_slice(trimmed).map_err(|e| ClientError::Decode(e.to_string()))?;
    if let Some(err) = frame.error {
        return Err(ClientError::Transport(format!("subscription error: {}", err)));
    }
    Ok(frame.result)
}
