//! 调用上下文
//!
//! 不可变的键值覆盖链：每次派生都会分配一个指向父节点的新节点，
//! 父节点永远不会被修改，因此并发调用共享祖先上下文时无需加锁。

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// 上下文中存储的值
pub type ContextValue = Arc<dyn Any + Send + Sync>;

struct Node {
    key: TypeId,
    // `None` marks a cleared binding that shadows any ancestor value.
    value: Option<ContextValue>,
    parent: Option<Arc<Node>>,
}

/// Request-scoped, immutable value carrier threaded through every stage of a call.
///
/// Cloning is cheap: a clone shares the same node chain and the same
/// cancellation signal.
#[derive(Clone, Default)]
pub struct Context {
    head: Option<Arc<Node>>,
    cancel: CancellationToken,
}

impl Context {
    /// 创建一个空上下文
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives a context observing `token` as the call's cancellation signal.
    #[must_use]
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            head: self.head.clone(),
            cancel: token,
        }
    }

    /// Derives a context binding `value` under the key type `K`.
    ///
    /// Passing `None` records an explicit "no value" binding, so `value::<K>()`
    /// on the result reads `None` even if an ancestor bound `K`.
    #[must_use]
    pub fn with_value<K: 'static>(&self, value: Option<ContextValue>) -> Self {
        Self {
            head: Some(Arc::new(Node {
                key: TypeId::of::<K>(),
                value,
                parent: self.head.clone(),
            })),
            cancel: self.cancel.clone(),
        }
    }

    /// Returns the most recent binding for `K` reachable from this context.
    pub fn value<K: 'static>(&self) -> Option<&ContextValue> {
        let key = TypeId::of::<K>();
        let mut node = self.head.as_deref();
        while let Some(current) = node {
            if current.key == key {
                return current.value.as_ref();
            }
            node = current.parent.as_deref();
        }
        None
    }

    /// 取消信号
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Completes once the call this context belongs to is cancelled.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    /// Returns the context attached to a request, or a fresh one.
    pub fn from_extensions(extensions: &http::Extensions) -> Self {
        extensions.get::<Context>().cloned().unwrap_or_default()
    }

    /// Number of derivations in this context's chain.
    pub(crate) fn depth(&self) -> usize {
        let mut depth = 0;
        let mut node = self.head.as_deref();
        while let Some(current) = node {
            depth += 1;
            node = current.parent.as_deref();
        }
        depth
    }

    /// Whether both contexts share the same head node.
    pub(crate) fn same_chain(&self, other: &Context) -> bool {
        match (&self.head, &other.head) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("depth", &self.depth())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl<S> axum::extract::FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        Ok(Context::from_extensions(&parts.extensions))
    }
}
