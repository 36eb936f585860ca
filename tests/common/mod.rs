//! Shared fixtures: a passphrase authenticator, identity assertions and test logging.

use http::HeaderValue;
use http::header::WWW_AUTHENTICATE;
use rpc_authn::{
    AuthError, AuthRequest, Context, Identity, identity, unauthenticated, without_identity,
};
use tracing_subscriber::EnvFilter;

pub const HERO: &str = "Ali Baba";
pub const PASSPHRASE: &str = "opensesame";

/// Installs a test subscriber once; `RUST_LOG=rpc_authn=debug` shows the decisions.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub async fn authenticate(_ctx: Context, req: AuthRequest) -> Result<Option<Identity>, AuthError> {
    let Some(token) = req.bearer_token() else {
        return Err(unauthenticated!("expected Bearer authentication scheme")
            .with_meta(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer")));
    };
    if token != PASSPHRASE {
        return Err(unauthenticated!("{token:?} is not the magic passphrase"));
    }
    Ok(Some(Identity::new(HERO.to_string())))
}

pub fn assert_identity(ctx: &Context) {
    let id = identity(ctx).expect("no authenticated identity");
    let name = id
        .downcast_ref::<String>()
        .expect("identity should be a String");
    assert_eq!(name, HERO);
    assert!(
        identity(&without_identity(ctx)).is_none(),
        "identity survived without_identity"
    );
}
