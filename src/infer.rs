//! Protocol and procedure inference from raw HTTP request data.
//!
//! Used only by the transport-level middleware, which runs before any RPC
//! framing has been parsed. Failures degrade to empty values rather than errors.

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use http::header::CONTENT_TYPE;
use http::{Extensions, HeaderMap};
use tonic::transport::server::TcpConnectInfo;

use crate::request::Protocol;

const GRPC_CONTENT_TYPE: &str = "application/grpc";
const GRPC_WEB_CONTENT_TYPE: &str = "application/grpc-web";
/// Length of the shortest procedure, `/a/b`.
const MIN_PROCEDURE_LEN: usize = 4;

/// Infers `/service/method` from a request path.
///
/// Assumes handlers are mounted with their procedure as the final two path
/// segments, as generated clients do. One trailing slash is ignored. Returns an
/// empty string when the path has fewer than two segments or the result is
/// shorter than `/a/b`.
pub fn infer_procedure(path: &str) -> String {
    let path = path.strip_suffix('/').unwrap_or(path);
    let Some(ultimate) = path.rfind('/') else {
        return String::new();
    };
    let Some(penultimate) = path[..ultimate].rfind('/') else {
        return String::new();
    };
    let procedure = &path[penultimate..];
    if procedure.len() < MIN_PROCEDURE_LEN {
        return String::new();
    }
    procedure.to_string()
}

/// Infers the wire protocol from the `Content-Type` header.
pub fn infer_protocol(headers: &HeaderMap) -> Protocol {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    // grpc-web first: its prefix also matches plain grpc
    if content_type.starts_with(GRPC_WEB_CONTENT_TYPE) {
        Protocol::GrpcWeb
    } else if content_type.starts_with(GRPC_CONTENT_TYPE) {
        Protocol::Grpc
    } else {
        Protocol::Connect
    }
}

/// Peer address recorded by axum or tonic, or an empty string.
pub fn infer_client_addr(extensions: &Extensions) -> String {
    if let Some(ConnectInfo(addr)) = extensions.get::<ConnectInfo<SocketAddr>>() {
        return addr.to_string();
    }
    extensions
        .get::<TcpConnectInfo>()
        .and_then(TcpConnectInfo::remote_addr)
        .map(|addr| addr.to_string())
        .unwrap_or_default()
}
