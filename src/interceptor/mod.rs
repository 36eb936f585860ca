//! gRPC 拦截器模块
//!
//! 在解码后的调用管道中进行认证（unary 与 streaming）

pub mod auth;

pub use auth::AuthInterceptor;
