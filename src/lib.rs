//! RPC Authentication Library
//!
//! Pluggable authentication for gRPC, gRPC-Web and Connect servers. A
//! caller-supplied [`Authenticator`] decides every inbound call once, before
//! application code runs; the resulting [`Identity`] travels with the call's
//! [`Context`]. Calls are intercepted either at the HTTP level with
//! [`AuthLayer`] (before the body is decoded) or inside the decoded RPC
//! pipeline with [`AuthInterceptor`].

pub mod authenticator;
pub mod config;
pub mod context;
pub mod error;
pub mod identity;
pub mod infer;
pub mod interceptor;
pub mod middleware;
pub mod request;

// Re-exports
pub use authenticator::Authenticator;
pub use config::AuthConfig;
pub use context::Context;
pub use error::{AuthError, BoxError, ConfigError, ConnectCode, Result};
pub use identity::{Identity, attach_identity, identity, without_identity};
pub use infer::{infer_client_addr, infer_procedure, infer_protocol};
pub use interceptor::AuthInterceptor;
pub use middleware::{
    AuthLayer, AuthMiddleware, Classifier, ContentTypeClassifier, SpecLayer, SpecService,
};
pub use request::{AuthRequest, Peer, Protocol, Spec};
