//! 请求分类
//!
//! 根据 Content-Type 判断 HTTP 请求是否为 RPC 调用

use axum::extract::Query;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, Method, Uri};

use crate::config::AuthConfig;

const GRPC_PREFIXES: [&str; 3] = [
    "application/grpc-web-text",
    "application/grpc-web",
    "application/grpc",
];
const CONNECT_STREAMING_PREFIX: &str = "application/connect+";

/// Decides whether an inbound HTTP request is an RPC call.
///
/// Requests that are not RPCs bypass authentication entirely.
pub trait Classifier: Send + Sync + 'static {
    fn is_rpc(&self, method: &Method, uri: &Uri, headers: &HeaderMap) -> bool;
}

/// Classifies by content type against a set of codec names.
#[derive(Debug, Clone)]
pub struct ContentTypeClassifier {
    codecs: Vec<String>,
    connect_get: bool,
}

impl ContentTypeClassifier {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            codecs: config
                .codecs
                .iter()
                .map(|codec| codec.to_ascii_lowercase())
                .collect(),
            connect_get: config.connect_get,
        }
    }

    fn has_codec(&self, name: &str) -> bool {
        self.codecs.iter().any(|codec| codec == name)
    }

    fn is_connect_get(&self, uri: &Uri) -> bool {
        // 查询参数按 application/x-www-form-urlencoded 解码
        let Ok(Query(pairs)) = Query::<Vec<(String, String)>>::try_from_uri(uri) else {
            return false;
        };
        pairs
            .iter()
            .any(|(key, value)| key == "encoding" && self.has_codec(value))
    }
}

impl Default for ContentTypeClassifier {
    fn default() -> Self {
        Self::from_config(&AuthConfig::default())
    }
}

impl Classifier for ContentTypeClassifier {
    fn is_rpc(&self, method: &Method, uri: &Uri, headers: &HeaderMap) -> bool {
        if *method == Method::GET {
            return self.connect_get && self.is_connect_get(uri);
        }

        let Some(content_type) = media_type(headers) else {
            return false;
        };

        for prefix in GRPC_PREFIXES {
            if content_type == prefix {
                return true;
            }
            if let Some(codec) = content_type
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix('+'))
            {
                return self.has_codec(codec);
            }
        }

        if let Some(codec) = content_type.strip_prefix(CONNECT_STREAMING_PREFIX) {
            return self.has_codec(codec);
        }

        content_type
            .strip_prefix("application/")
            .is_some_and(|codec| self.has_codec(codec))
    }
}

/// Lower-cased `Content-Type` without parameters.
pub(crate) fn media_type(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let media = value.split(';').next().unwrap_or("").trim();
    (!media.is_empty()).then(|| media.to_ascii_lowercase())
}

/// Whether the request uses Connect's streaming framing.
pub(crate) fn is_connect_streaming(headers: &HeaderMap) -> bool {
    media_type(headers).is_some_and(|ct| ct.starts_with(CONNECT_STREAMING_PREFIX))
}
