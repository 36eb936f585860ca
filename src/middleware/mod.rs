//! HTTP 认证中间件
//!
//! 在请求体被读取和解码之前完成认证，拒绝的调用不会产生解压和反序列化开销。

pub mod classify;
pub mod error_writer;
pub mod spec;

pub use classify::{Classifier, ContentTypeClassifier};
pub use spec::{SpecLayer, SpecService};

use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use bytes::Bytes;
use futures::future::BoxFuture;
use tower::{Layer, Service};
use tracing::trace;

use crate::authenticator::{Authenticator, authenticate_call};
use crate::config::AuthConfig;
use crate::context::Context;
use crate::request::AuthRequest;

/// Tower layer authenticating RPC requests at the HTTP level.
///
/// Requests the classifier does not recognize as RPCs pass through
/// untouched. Authenticated requests reach the inner service with the
/// augmented [`Context`], a [`Spec`](crate::Spec) and a [`Peer`](crate::Peer)
/// in their extensions.
///
/// ```no_run
/// use axum::{Router, routing::post};
/// use rpc_authn::{AuthLayer, AuthRequest, Context, Identity, unauthenticated};
///
/// let layer = AuthLayer::new(|_ctx: Context, req: AuthRequest| async move {
///     match req.bearer_token() {
///         Some("open-sesame") => Ok(Some(Identity::new("Ali Baba"))),
///         _ => Err(unauthenticated!("try \"open-sesame\" as a bearer token instead")),
///     }
/// });
/// let app: Router = Router::new()
///     .route("/example.v1.TestService/GetEmpty", post(|| async { "{}" }))
///     .layer(layer);
/// ```
#[derive(Clone)]
pub struct AuthLayer {
    auth: Arc<dyn Authenticator>,
    classifier: Arc<dyn Classifier>,
}

impl AuthLayer {
    pub fn new(auth: impl Authenticator) -> Self {
        Self {
            auth: Arc::new(auth),
            classifier: Arc::new(ContentTypeClassifier::default()),
        }
    }

    pub fn with_config(auth: impl Authenticator, config: &AuthConfig) -> Self {
        Self::new(auth).classifier(ContentTypeClassifier::from_config(config))
    }

    /// 替换请求分类器
    #[must_use]
    pub fn classifier(mut self, classifier: impl Classifier) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Wraps `next` so RPC requests are authenticated before reaching it.
    pub fn wrap<S>(&self, next: S) -> AuthMiddleware<S> {
        self.layer(next)
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            auth: self.auth.clone(),
            classifier: self.classifier.clone(),
        }
    }
}

/// Service produced by [`AuthLayer`].
#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    auth: Arc<dyn Authenticator>,
    classifier: Arc<dyn Classifier>,
}

impl<S, ReqBody, ResBody> Service<http::Request<ReqBody>> for AuthMiddleware<S>
where
    S: Service<http::Request<ReqBody>, Response = http::Response<ResBody>>
        + Clone
        + Send
        + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Default + From<Bytes> + Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: http::Request<ReqBody>) -> Self::Future {
        // keep the service that was driven to readiness
        let not_ready_inner = self.inner.clone();
        let mut ready_inner = std::mem::replace(&mut self.inner, not_ready_inner);

        if !self
            .classifier
            .is_rpc(request.method(), request.uri(), request.headers())
        {
            trace!(path = %request.uri().path(), "Not an RPC request, skipping authentication");
            return Box::pin(async move { ready_inner.call(request).await });
        }

        let auth = self.auth.clone();
        Box::pin(async move {
            let (spec, peer) = spec::describe(&request);
            let ctx = Context::from_extensions(request.extensions());
            let auth_request =
                AuthRequest::new(spec.clone(), peer.clone(), request.headers().clone());

            match authenticate_call(auth.as_ref(), ctx, auth_request).await {
                Ok(ctx) => {
                    let extensions = request.extensions_mut();
                    extensions.insert(ctx);
                    extensions.insert(spec);
                    extensions.insert(peer);
                    ready_inner.call(request).await
                }
                Err(err) => Ok(error_writer::write_error(request.headers(), err)),
            }
        })
    }
}
