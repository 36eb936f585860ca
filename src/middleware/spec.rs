//! 调用描述中间件
//!
//! 不做认证，只把从 HTTP 请求推断出的 `Spec` 与 `Peer` 写入请求扩展，
//! 供解码后管道中的 [`AuthInterceptor`](crate::AuthInterceptor) 使用。

use std::task::{Context as TaskContext, Poll};

use tower::{Layer, Service};

use crate::infer::{infer_client_addr, infer_procedure, infer_protocol};
use crate::request::{Peer, Spec};

/// Tower layer recording the call's [`Spec`] and [`Peer`] in request extensions.
///
/// Mount it in front of a tonic server that authenticates with
/// [`AuthInterceptor`](crate::AuthInterceptor): generated server stubs do not
/// expose the procedure to the call pipeline, this layer does.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecLayer;

impl SpecLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for SpecLayer {
    type Service = SpecService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SpecService { inner }
    }
}

/// Service produced by [`SpecLayer`].
#[derive(Debug, Clone)]
pub struct SpecService<S> {
    inner: S,
}

impl<S, B> Service<http::Request<B>> for SpecService<S>
where
    S: Service<http::Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: http::Request<B>) -> Self::Future {
        let (spec, peer) = describe(&request);
        let extensions = request.extensions_mut();
        extensions.insert(spec);
        extensions.insert(peer);
        self.inner.call(request)
    }
}

/// Infers the call's procedure and peer from the raw HTTP request.
pub(crate) fn describe<B>(request: &http::Request<B>) -> (Spec, Peer) {
    let spec = Spec {
        procedure: infer_procedure(request.uri().path()),
    };
    let peer = Peer {
        addr: infer_client_addr(request.extensions()),
        protocol: infer_protocol(request.headers()),
    };
    (spec, peer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Protocol;
    use axum::extract::ConnectInfo;
    use http::{Request, Response};
    use std::convert::Infallible;
    use std::net::SocketAddr;
    use tower::{ServiceExt, service_fn};

    #[tokio::test]
    async fn records_spec_and_peer() {
        let svc = SpecLayer::new().layer(service_fn(|req: Request<()>| async move {
            let spec = req.extensions().get::<Spec>().cloned().unwrap_or_default();
            let peer = req.extensions().get::<Peer>().cloned().unwrap_or_default();
            Ok::<_, Infallible>(Response::new((spec, peer)))
        }));

        let mut request = Request::post("/pkg.Service/Method")
            .header("content-type", "application/grpc+proto")
            .body(())
            .unwrap();
        let addr: SocketAddr = "10.0.0.2:7000".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));

        let (spec, peer) = svc.oneshot(request).await.unwrap().into_body();
        assert_eq!(spec.procedure, "/pkg.Service/Method");
        assert_eq!(peer.protocol, Protocol::Grpc);
        assert_eq!(peer.addr, "10.0.0.2:7000");
    }

    #[test]
    fn describe_degrades_to_empty() {
        let request = Request::get("/health").body(()).unwrap();
        let (spec, peer) = describe(&request);
        assert_eq!(spec.procedure, "");
        assert_eq!(peer.addr, "");
        assert_eq!(peer.protocol, Protocol::Connect);
    }
}
