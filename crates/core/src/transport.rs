//! Transport Factory
//!
//! A transport binds one realtime model endpoint to an optional audio sink.
//! It is single-use: every connect attempt gets a freshly built one.

use crate::options::AudioSink;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, sync::Arc};
use url::Url;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Wire transport used to reach the realtime endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Peer connection negotiated through an SDP exchange.
    WebRtc,
    #[default]
    WebSocket,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::WebRtc => "webrtc",
            TransportKind::WebSocket => "websocket",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = crate::options::UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "webrtc" => Ok(TransportKind::WebRtc),
            "websocket" | "ws" => Ok(TransportKind::WebSocket),
            other => Err(crate::options::UnknownOption {
                kind: "transport",
                value: other.to_string(),
            }),
        }
    }
}

/// A transport scoped to one model endpoint and sink.
#[derive(Clone)]
pub struct Transport {
    pub kind: TransportKind,
    pub model: String,
    pub endpoint: Url,
    pub audio_sink: Option<Arc<dyn AudioSink>>,
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("endpoint", &self.endpoint.as_str())
            .field("audio_sink", &self.audio_sink.is_some())
            .finish()
    }
}

/// Validated base URL of the API (e.g. `https://api.openai.com/v1`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiBase(Url);

impl ApiBase {
    pub fn parse(raw: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(raw.trim_end_matches('/'))?;
        if url.cannot_be_a_base() {
            return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase);
        }
        Ok(Self(url))
    }

    /// `{base}/{segments...}` as a URL.
    pub fn join(&self, segments: &[&str]) -> Url {
        let mut url = self.0.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for ApiBase {
    fn default() -> Self {
        Self(Url::parse(DEFAULT_API_BASE).expect("default API base is a valid URL"))
    }
}

/// Builds the endpoint URL for `kind`, with the model URL-encoded in the query.
///
/// WebRTC calls go to `{base}/realtime/calls`, WebSocket sessions to
/// `{base}/realtime` with the scheme switched to `ws`/`wss`.
pub fn endpoint_url(api_base: &ApiBase, kind: TransportKind, model: &str) -> Url {
    let mut url = match kind {
        TransportKind::WebRtc => api_base.join(&["realtime", "calls"]),
        TransportKind::WebSocket => api_base.join(&["realtime"]),
    };
    url.query_pairs_mut().clear().append_pair("model", model);
    if kind == TransportKind::WebSocket {
        let scheme = if url.scheme() == "http" { "ws" } else { "wss" };
        // http(s) -> ws(s) is always an allowed scheme change
        let _ = url.set_scheme(scheme);
    }
    url
}

/// Creates a transport bound to `model` and the optional audio sink.
pub fn create_transport(
    api_base: &ApiBase,
    kind: TransportKind,
    model: &str,
    audio_sink: Option<Arc<dyn AudioSink>>,
) -> Transport {
    Transport {
        kind,
        model: model.to_string(),
        endpoint: endpoint_url(api_base, kind, model),
        audio_sink,
    }
}
