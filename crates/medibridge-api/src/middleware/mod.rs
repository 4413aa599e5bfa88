//! Request interceptors and response middleware
//!
//! Author: hephaex@gmail.com

pub mod gates;
pub mod pipeline;
pub mod security_headers;

pub use gates::{Authenticate, RequireRole};
pub use pipeline::{pipeline, Authenticated, InterceptExt, Interceptor, Pipeline, RequestContext};
pub use security_headers::security_headers_middleware;
