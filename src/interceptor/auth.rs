use std::future::Future;
use std::sync::Arc;

use futures::Stream;
use tonic::{GrpcMethod, Request, Response, Status};

use crate::authenticator::{Authenticator, authenticate_call};
use crate::context::Context;
use crate::request::{AuthRequest, Peer, Protocol, Spec};

/// 认证拦截器
///
/// Authenticates decoded calls inside the RPC pipeline. Every call reaching
/// it is already a recognized RPC, so no classification is done. The
/// procedure and peer are read from the [`Spec`] and [`Peer`] extensions,
/// which [`SpecLayer`](crate::SpecLayer) records in front of a tonic server,
/// and the headers from the request metadata.
///
/// Use it over [`AuthLayer`](crate::AuthLayer) when handlers are mounted at
/// unconventional paths or when authentication depends on state an earlier
/// stage attached to the request.
#[derive(Clone)]
pub struct AuthInterceptor {
    auth: Arc<dyn Authenticator>,
}

impl AuthInterceptor {
    pub fn new(auth: impl Authenticator) -> Self {
        Self {
            auth: Arc::new(auth),
        }
    }

    /// Authenticates a unary call, then hands it to `next` with the
    /// augmented [`Context`] in its extensions.
    pub async fn unary<Req, Res, F, Fut>(
        &self,
        request: Request<Req>,
        next: F,
    ) -> Result<Response<Res>, Status>
    where
        F: FnOnce(Request<Req>) -> Fut,
        Fut: Future<Output = Result<Response<Res>, Status>>,
    {
        let request = self.authenticate(request).await?;
        next(request).await
    }

    /// Authenticates an inbound stream from its request metadata.
    ///
    /// The stream is not polled before the decision; on success the augmented
    /// context covers the whole stream.
    pub async fn streaming_handler<S, R, F, Fut>(
        &self,
        request: Request<S>,
        next: F,
    ) -> Result<R, Status>
    where
        S: Stream,
        F: FnOnce(Request<S>) -> Fut,
        Fut: Future<Output = Result<R, Status>>,
    {
        let request = self.authenticate(request).await?;
        next(request).await
    }

    /// Outbound calls are not authenticated here; the request is returned as is.
    pub fn streaming_client<T>(&self, request: Request<T>) -> Request<T> {
        request
    }

    async fn authenticate<T>(&self, mut request: Request<T>) -> Result<Request<T>, Status> {
        let ctx = Context::from_extensions(request.extensions());
        let ctx = authenticate_call(self.auth.as_ref(), ctx, describe(&request)).await?;
        request.extensions_mut().insert(ctx);
        Ok(request)
    }
}

/// Builds the descriptor from data the framework already parsed.
fn describe<T>(request: &Request<T>) -> AuthRequest {
    let extensions = request.extensions();
    let spec = extensions
        .get::<Spec>()
        .cloned()
        .or_else(|| {
            extensions
                .get::<GrpcMethod<'static>>()
                .map(|method| Spec {
                    procedure: format!("/{}/{}", method.service(), method.method()),
                })
        })
        .unwrap_or_default();
    let peer = extensions.get::<Peer>().cloned().unwrap_or_else(|| Peer {
        addr: request
            .remote_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_default(),
        protocol: Protocol::Grpc,
    });
    AuthRequest::new(spec, peer, request.metadata().clone().into_headers())
}
