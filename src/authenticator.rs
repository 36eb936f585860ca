//! Authentication function contract and the shared authenticate-and-augment step.

use std::future::Future;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::context::Context;
use crate::error::{self, AuthError, BoxError};
use crate::identity::{Identity, attach_identity};
use crate::request::AuthRequest;

/// Decides whether a call may proceed.
///
/// Implementations are invoked once per inbound call, concurrently and in no
/// particular order, so they must be `Send + Sync`. Return `Err` for any
/// authentication failure; the error is usually built with
/// [`unauthenticated!`](crate::unauthenticated) but any error will do. On
/// success the returned identity, if any, is attached to the call context.
///
/// Async closures of the shape `Fn(Context, AuthRequest) -> Future` implement
/// this trait.
#[async_trait]
pub trait Authenticator: Send + Sync + 'static {
    async fn authenticate(
        &self,
        ctx: Context,
        req: AuthRequest,
    ) -> Result<Option<Identity>, BoxError>;
}

#[async_trait]
impl<F, Fut, E> Authenticator for F
where
    F: Fn(Context, AuthRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Identity>, E>> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    async fn authenticate(
        &self,
        ctx: Context,
        req: AuthRequest,
    ) -> Result<Option<Identity>, BoxError> {
        (self)(ctx, req).await.map_err(Into::into)
    }
}

/// Runs the authenticator for one call and returns the augmented context.
///
/// The authenticator races the call's cancellation signal; a cancelled call
/// fails with `Cancelled` without waiting for it.
pub(crate) async fn authenticate_call(
    auth: &dyn Authenticator,
    ctx: Context,
    req: AuthRequest,
) -> error::Result<Context> {
    let procedure = req.procedure.clone();
    let protocol = req.protocol;

    let outcome = tokio::select! {
        biased;
        _ = ctx.cancelled() => {
            return Err(AuthError::from(tonic::Status::cancelled(
                "call cancelled during authentication",
            )));
        }
        outcome = auth.authenticate(ctx.clone(), req) => outcome,
    };

    match outcome {
        Ok(identity) => {
            debug!(
                procedure = %procedure,
                protocol = %protocol,
                identified = identity.is_some(),
                "Request authenticated"
            );
            Ok(attach_identity(&ctx, identity))
        }
        Err(err) => {
            let err = AuthError::from_boxed(err);
            warn!(
                procedure = %procedure,
                protocol = %protocol,
                code = ?err.code(),
                error = %err.message(),
                "Request rejected"
            );
            Err(err)
        }
    }
}
