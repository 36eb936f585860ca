//! 请求描述
//!
//! 认证函数所需的调用信息快照

use std::fmt;

use http::HeaderMap;
use http::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};

/// Wire protocol that framed a call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Connect, the default when no gRPC content type is present.
    #[default]
    Connect,
    Grpc,
    GrpcWeb,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Connect => "connect",
            Protocol::Grpc => "grpc",
            Protocol::GrpcWeb => "grpcweb",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Procedure addressed by a call, as parsed by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Spec {
    pub procedure: String,
}

/// The other side of a call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Peer {
    pub addr: String,
    pub protocol: Protocol,
}

/// Facts about one inbound call, handed to the authentication function.
#[derive(Debug, Clone, Default)]
pub struct AuthRequest {
    /// `/service/method`, empty when it cannot be determined.
    pub procedure: String,
    /// Peer `host:port`, empty when unknown.
    pub client_addr: String,
    pub protocol: Protocol,
    pub headers: HeaderMap,
}

impl AuthRequest {
    pub fn new(spec: Spec, peer: Peer, headers: HeaderMap) -> Self {
        Self {
            procedure: spec.procedure,
            client_addr: peer.addr,
            protocol: peer.protocol,
            headers,
        }
    }

    /// First value of header `name`, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Credential of an `Authorization: Bearer <token>` header.
    pub fn bearer_token(&self) -> Option<&str> {
        let value = self.headers.get(AUTHORIZATION)?.to_str().ok()?;
        let (scheme, token) = value.split_once(' ')?;
        (scheme == "Bearer").then_some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_auth(value: &'static str) -> AuthRequest {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value.parse().unwrap());
        AuthRequest {
            headers,
            ..Default::default()
        }
    }

    #[test]
    fn bearer_token_requires_scheme() {
        assert_eq!(with_auth("Bearer opensesame").bearer_token(), Some("opensesame"));
        assert_eq!(with_auth("Basic b3Blbg==").bearer_token(), None);
        assert_eq!(with_auth("Bearer").bearer_token(), None);
        assert_eq!(AuthRequest::default().bearer_token(), None);
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let req = with_auth("Bearer x");
        assert_eq!(req.header("authorization"), Some("Bearer x"));
        assert_eq!(req.header("Authorization"), Some("Bearer x"));
        assert_eq!(req.header("x-missing"), None);
    }

    #[test]
    fn protocol_tags() {
        assert_eq!(Protocol::default(), Protocol::Connect);
        assert_eq!(Protocol::Grpc.to_string(), "grpc");
        assert_eq!(Protocol::GrpcWeb.as_str(), "grpcweb");
    }

    #[test]
    fn new_flattens_spec_and_peer() {
        let req = AuthRequest::new(
            Spec {
                procedure: "/pkg.Service/Method".to_string(),
            },
            Peer {
                addr: "10.0.0.1:4000".to_string(),
                protocol: Protocol::Grpc,
            },
            HeaderMap::new(),
        );
        assert_eq!(req.procedure, "/pkg.Service/Method");
        assert_eq!(req.client_addr, "10.0.0.1:4000");
        assert_eq!(req.protocol, Protocol::Grpc);
    }
}
