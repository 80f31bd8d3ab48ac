//! Resource handler trait

use std::future::Future;

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::error::McpResult;
use crate::model::ContentItem;

/// Produces the content of a resource read.
///
/// Used for static resources, template routes and the default resource
/// handler. Template routes find their extracted parameters in `ctx.params`.
#[async_trait]
pub trait McpResource: Send + Sync {
    async fn read(&self, uri: &str, ctx: &RequestContext) -> McpResult<Vec<ContentItem>>;
}

/// Adapter turning an async closure into an [`McpResource`]
pub struct FnResource<F> {
    f: F,
}

impl<F> FnResource<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> McpResource for FnResource<F>
where
    F: Fn(String, RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = McpResult<Vec<ContentItem>>> + Send,
{
    async fn read(&self, uri: &str, ctx: &RequestContext) -> McpResult<Vec<ContentItem>> {
        (self.f)(uri.to_string(), ctx.clone()).await
    }
}
