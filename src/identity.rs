//! Identity channel: attach, read and strip the authentication result.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::context::Context;

/// Private lookup key; only the functions below can reach the binding.
struct IdentityKey;

/// Opaque result of a successful authentication.
///
/// Holds any `'static` value. Consumers must check the concrete type before
/// using it, see [`Identity::downcast_ref`].
#[derive(Clone)]
pub struct Identity(Arc<dyn Any + Send + Sync>);

impl Identity {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Returns the identity as `T`, or `None` when it holds another type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.0.is::<T>()
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Identity(..)")
    }
}

/// Returns a context carrying `identity`.
///
/// `None` is a no-op: the input context is returned unchanged.
pub fn attach_identity(ctx: &Context, identity: Option<Identity>) -> Context {
    match identity {
        Some(Identity(value)) => ctx.with_value::<IdentityKey>(Some(value)),
        None => ctx.clone(),
    }
}

/// 获取已认证的身份（如果有）
pub fn identity(ctx: &Context) -> Option<Identity> {
    ctx.value::<IdentityKey>().cloned().map(Identity)
}

/// Returns a context whose [`identity`] reads `None`, whatever its ancestors hold.
pub fn without_identity(ctx: &Context) -> Context {
    ctx.with_value::<IdentityKey>(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_is_unauthenticated() {
        assert!(identity(&Context::new()).is_none());
    }

    #[test]
    fn attach_then_read() {
        let ctx = attach_identity(&Context::new(), Some(Identity::new("Ali Baba")));
        let id = identity(&ctx).expect("identity attached");
        assert_eq!(id.downcast_ref::<&str>(), Some(&"Ali Baba"));
        assert!(id.downcast_ref::<String>().is_none());
    }

    #[test]
    fn attaching_none_is_a_no_op() {
        let base = Context::new().with_value::<u8>(Some(Arc::new(1u8)));
        let ctx = attach_identity(&base, None);
        assert!(ctx.same_chain(&base));
        assert_eq!(ctx.depth(), base.depth());
        assert!(identity(&ctx).is_none());
    }

    #[test]
    fn strip_after_attach_reads_none() {
        let ctx = attach_identity(&Context::new(), Some(Identity::new(42u64)));
        let stripped = without_identity(&ctx);
        assert!(identity(&stripped).is_none());
        // the ancestor still sees its own binding
        assert!(identity(&ctx).is_some());
    }

    #[test]
    fn strip_on_fresh_context_reads_none() {
        assert!(identity(&without_identity(&Context::new())).is_none());
    }

    #[test]
    fn reattach_after_strip() {
        let ctx = attach_identity(&Context::new(), Some(Identity::new(1i32)));
        let ctx = attach_identity(&without_identity(&ctx), Some(Identity::new(2i32)));
        assert_eq!(identity(&ctx).unwrap().downcast_ref::<i32>(), Some(&2));
    }
}
