//! 认证错误处理模块
//!
//! 将认证函数返回的任意错误映射为带有 unauthenticated 分类的线上状态

pub mod code;

pub use code::ConnectCode;

use http::{HeaderMap, HeaderName, HeaderValue};
use thiserror::Error;
use tonic::metadata::MetadataMap;
use tonic::{Code, Status};

/// 任意错误类型
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AuthError>;

/// Builds an [`AuthError`] coded `Unauthenticated` from a format string.
///
/// ```
/// use http::header::WWW_AUTHENTICATE;
/// use http::HeaderValue;
///
/// let token = "letmein";
/// let mut err = rpc_authn::unauthenticated!("{token:?} is not the magic passphrase");
/// err.meta_mut().insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
/// assert_eq!(err.message(), "\"letmein\" is not the magic passphrase");
/// ```
#[macro_export]
macro_rules! unauthenticated {
    ($($arg:tt)*) => {
        $crate::error::AuthError::unauthenticated(::std::format!($($arg)*))
    };
}

/// Authentication failure as written back to the caller.
#[derive(Error, Debug, Clone)]
#[error("{}: {message}", .code.connect_name())]
pub struct AuthError {
    code: Code,
    message: String,
    metadata: HeaderMap,
}

impl AuthError {
    /// 创建 unauthenticated 错误
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self {
            code: Code::Unauthenticated,
            message: message.into(),
            metadata: HeaderMap::new(),
        }
    }

    /// Maps any error returned by an authentication function.
    ///
    /// An `AuthError` is kept as is and a `tonic::Status` keeps its own code,
    /// message and metadata. Anything else is coded `Unauthenticated` with the
    /// error's display text as message.
    pub fn from_boxed(err: BoxError) -> Self {
        let err = match err.downcast::<AuthError>() {
            Ok(auth) => return *auth,
            Err(err) => err,
        };
        match err.downcast::<Status>() {
            Ok(status) => Self::from(*status),
            Err(err) => Self::unauthenticated(err.to_string()),
        }
    }

    pub fn code(&self) -> Code {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Metadata surfaced to the caller, e.g. a `WWW-Authenticate` challenge.
    pub fn meta(&self) -> &HeaderMap {
        &self.metadata
    }

    pub fn meta_mut(&mut self) -> &mut HeaderMap {
        &mut self.metadata
    }

    /// 添加元数据
    #[must_use]
    pub fn with_meta(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.metadata.append(name, value);
        self
    }
}

impl From<Status> for AuthError {
    fn from(status: Status) -> Self {
        // an OK status still aborts the call
        let code = match status.code() {
            Code::Ok => Code::Unauthenticated,
            code => code,
        };
        Self {
            code,
            message: status.message().to_string(),
            metadata: status.metadata().clone().into_headers(),
        }
    }
}

impl From<AuthError> for Status {
    fn from(err: AuthError) -> Self {
        Status::with_metadata(
            err.code,
            err.message,
            MetadataMap::from_headers(err.metadata),
        )
    }
}

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
