//! Redirect handlers.
//!
//! Both return passthrough responses, so builds skip them and the serve
//! engine returns them verbatim.

use crate::route::{Context, Output, Response};
use anyhow::Result;

/// `307 Temporary Redirect` to a fixed location.
pub fn temporary(
    location: impl Into<String>,
) -> impl Fn(&Context<'_>) -> Result<Output> + Send + Sync + Clone + 'static {
    fixed(307, location.into())
}

/// `308 Permanent Redirect` to a fixed location.
pub fn permanent(
    location: impl Into<String>,
) -> impl Fn(&Context<'_>) -> Result<Output> + Send + Sync + Clone + 'static {
    fixed(308, location.into())
}

/// `307` to a location computed from the request context.
pub fn temporary_with<F>(f: F) -> impl Fn(&Context<'_>) -> Result<Output> + Send + Sync + 'static
where
    F: Fn(&Context<'_>) -> Result<String> + Send + Sync + 'static,
{
    move |cx: &Context<'_>| Ok(redirect(307, &f(cx)?))
}

/// `308` to a location computed from the request context.
pub fn permanent_with<F>(f: F) -> impl Fn(&Context<'_>) -> Result<Output> + Send + Sync + 'static
where
    F: Fn(&Context<'_>) -> Result<String> + Send + Sync + 'static,
{
    move |cx: &Context<'_>| Ok(redirect(308, &f(cx)?))
}

fn fixed(
    status: u16,
    location: String,
) -> impl Fn(&Context<'_>) -> Result<Output> + Send + Sync + Clone + 'static {
    move |_: &Context<'_>| Ok(redirect(status, &location))
}

pub fn redirect(status: u16, location: &str) -> Output {
    Output::Passthrough(Response::new(status).with_header("Location", location))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::FingerprintTable;
    use crate::route::{Params, Request};
    use std::path::Path;

    fn call(h: impl Fn(&Context<'_>) -> Result<Output>, pathname: &str) -> Response {
        let request = Request::get(pathname);
        let params = Params::new();
        let urls = FingerprintTable::new();
        let cx = Context::new(&request, &params, pathname, Path::new("."), Path::new("."), &urls);
        match h(&cx).unwrap() {
            Output::Passthrough(resp) => resp,
            Output::Body(_) => panic!("redirects are passthrough responses"),
        }
    }

    #[test]
    fn test_fixed_redirects() {
        let resp = call(temporary("/new"), "/old");
        assert_eq!(resp.status, 307);
        assert_eq!(resp.header("Location"), Some("/new"));

        let resp = call(permanent("https://example.com/"), "/old");
        assert_eq!(resp.status, 308);
    }

    #[test]
    fn test_computed_location() {
        let h = permanent_with(|cx| Ok(format!("/archive{}", cx.pathname)));
        assert_eq!(call(h, "/2019/post").header("Location"), Some("/archive/2019/post"));
    }
}
