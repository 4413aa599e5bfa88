//! Request interceptor pipeline
//!
//! Routes declare an explicit, ordered list of [`Interceptor`]s. Each one
//! either lets the request continue or short-circuits with an [`AppError`];
//! the handler runs only when every interceptor passed. Interceptors share a
//! typed [`RequestContext`] whose `identity` is set once by authentication.

use crate::auth::Identity;
use crate::error::AppError;
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, Method},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use std::sync::Arc;

/// Per-request state visible to interceptors
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    /// Caller, once resolved
    pub identity: Option<Identity>,
}

impl RequestContext {
    fn from_request(request: &Request) -> Self {
        Self {
            method: request.method().clone(),
            path: request.uri().path().to_string(),
            headers: request.headers().clone(),
            identity: None,
        }
    }

    /// `METHOD /path`, as recorded in audit events
    pub fn resource(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// One step of the pipeline
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// `Ok(())` continues; `Err` becomes the response
    async fn intercept(&self, ctx: &mut RequestContext) -> Result<(), AppError>;
}

/// Ordered, immutable interceptor list
pub type Pipeline = Arc<[Arc<dyn Interceptor>]>;

pub fn pipeline<I>(interceptors: I) -> Pipeline
where
    I: IntoIterator<Item = Arc<dyn Interceptor>>,
{
    interceptors.into_iter().collect()
}

async fn run_pipeline(
    State(pipeline): State<Pipeline>,
    mut request: Request,
    next: Next,
) -> Response {
    // A context left by an outer pipeline carries its identity forward
    let mut ctx = request
        .extensions_mut()
        .remove::<RequestContext>()
        .unwrap_or_else(|| RequestContext::from_request(&request));

    for interceptor in pipeline.iter() {
        if let Err(err) = interceptor.intercept(&mut ctx).await {
            return err.into_response();
        }
    }

    if let Some(identity) = ctx.identity.clone() {
        request.extensions_mut().insert(identity);
    }
    request.extensions_mut().insert(ctx);
    next.run(request).await
}

/// Attach a pipeline in front of every route already on the router
pub trait InterceptExt {
    fn intercept_with(self, pipeline: Pipeline) -> Self;
}

impl<S> InterceptExt for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn intercept_with(self, pipeline: Pipeline) -> Self {
        self.route_layer(middleware::from_fn_with_state(pipeline, run_pipeline))
    }
}

/// Handler extractor for the resolved caller
#[derive(Debug, Clone)]
pub struct Authenticated(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(Authenticated)
            .ok_or(AppError::Unauthenticated)
    }
}
