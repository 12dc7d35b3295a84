//! JSON endpoints.

use crate::route::{Context, Output, Response};
use crate::utils::mime;
use anyhow::{Context as _, Result};
use serde_json::Value;

/// Serialize the returned value as an `application/json` passthrough response.
pub fn json<F>(f: F) -> impl Fn(&Context<'_>) -> Result<Output> + Send + Sync + 'static
where
    F: Fn(&Context<'_>) -> Result<Value> + Send + Sync + 'static,
{
    move |cx: &Context<'_>| {
        let value = f(cx)?;
        let body = serde_json::to_vec(&value)
            .with_context(|| format!("failed to encode JSON for {}", cx.pathname))?;
        Ok(Output::Passthrough(Response::ok(mime::types::JSON, body)))
    }
}
