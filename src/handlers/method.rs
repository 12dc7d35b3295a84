//! Per-method dispatch.
//!
//! ```ignore
//! let api = method::get(list).post(create);
//! app.route("/api/items", move |cx| api.call(cx))
//! ```
//!
//! Unlisted methods get `405 Method Not Allowed`; `HEAD` is answered by the
//! `get` handler unless one is registered for it. Builds simulate `GET`, so
//! only the `get` handler can produce an artifact.

use crate::route::{Context, Handler, Method, Output, Response, handler};
use anyhow::Result;

#[derive(Clone, Default)]
pub struct MethodGuard {
    handlers: Vec<(Method, Handler)>,
}

macro_rules! method_fns {
    ($($name:ident => $method:expr),* $(,)?) => {
        impl MethodGuard {
            $(
                pub fn $name<F, O>(self, f: F) -> Self
                where
                    F: Fn(&Context<'_>) -> Result<O> + Send + Sync + 'static,
                    O: Into<Output>,
                {
                    self.on($method, handler(f))
                }
            )*
        }

        $(
            pub fn $name<F, O>(f: F) -> MethodGuard
            where
                F: Fn(&Context<'_>) -> Result<O> + Send + Sync + 'static,
                O: Into<Output>,
            {
                MethodGuard::default().$name(f)
            }
        )*
    };
}

method_fns! {
    get => Method::Get,
    post => Method::Post,
    put => Method::Put,
    patch => Method::Patch,
    delete => Method::Delete,
}

impl MethodGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the handler for `method`.
    pub fn on(mut self, method: Method, h: Handler) -> Self {
        self.handlers.retain(|(m, _)| *m != method);
        self.handlers.push((method, h));
        self
    }

    fn find(&self, method: Method) -> Option<&Handler> {
        self.handlers.iter().find(|(m, _)| *m == method).map(|(_, h)| h)
    }

    /// `HEAD` falls back to the `GET` handler; the server drops the body.
    pub fn call(&self, cx: &Context<'_>) -> Result<Output> {
        let method = cx.request.method;
        let found = match method {
            Method::Head => self.find(Method::Head).or_else(|| self.find(Method::Get)),
            _ => self.find(method),
        };
        match found {
            Some(h) => h(cx),
            None => Ok(Output::Passthrough(Response::new(405))),
        }
    }

    pub fn into_handler(self) -> Handler {
        handler(move |cx| self.call(cx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::FingerprintTable;
    use crate::route::{Params, Request};
    use std::path::Path;

    fn call(guard: &MethodGuard, method: Method) -> Output {
        let request = Request::new(method, "/api");
        let params = Params::new();
        let urls = FingerprintTable::new();
        let cx = Context::new(&request, &params, "/api", Path::new("."), Path::new("."), &urls);
        guard.call(&cx).unwrap()
    }

    #[test]
    fn test_dispatch_by_method() {
        let guard = get(|_| Ok("list")).post(|_| Ok("created"));
        assert_eq!(call(&guard, Method::Get), Output::from("list"));
        assert_eq!(call(&guard, Method::Post), Output::from("created"));
    }

    #[test]
    fn test_unlisted_method_is_405() {
        let guard = delete(|_| Ok("gone"));
        assert_eq!(call(&guard, Method::Get), Output::Passthrough(Response::new(405)));
    }

    #[test]
    fn test_head_uses_get_handler() {
        let guard = get(|_| Ok("list"));
        assert_eq!(call(&guard, Method::Head), Output::from("list"));

        let guard = get(|_| Ok("list")).on(Method::Head, handler(|_| Ok("head")));
        assert_eq!(call(&guard, Method::Head), Output::from("head"));

        let guard = post(|_| Ok("created"));
        assert_eq!(call(&guard, Method::Head), Output::Passthrough(Response::new(405)));
    }

    #[test]
    fn test_later_registration_replaces() {
        let guard = get(|_| Ok("a")).get(|_| Ok("b"));
        assert_eq!(call(&guard, Method::Get), Output::from("b"));
    }
}
