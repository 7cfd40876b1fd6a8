//! Ordered pattern-matching dispatch over route actions.

use crate::{
    http::{
        request::Request,
        responder::Responder,
        types::{Method, Status},
    },
    server::channel::{Control, Handler},
};
use regex::Regex;

type RouteAction = Box<dyn Fn(&Request, &mut Responder, &[&str]) -> Status + Send + Sync>;

struct Route {
    method: Method,
    pattern: Regex,
    action: RouteAction,
}

/// Ordered table of `(method, URI pattern, action)` routes plus a default.
///
/// Patterns are regular expressions compiled at registration and implicitly
/// anchored to the whole URI; capture groups arrive at the action as
/// positional string parameters. Dispatch walks routes in registration
/// order and the first match wins; unmatched requests fall through to the
/// default action, or to a bare `404` when none is installed.
///
/// An action returns the [`Status`] to send. The router finalizes the
/// responder itself, unless the action already did — replaying a cached
/// response via [`send_cached`](Responder::send_cached) counts.
///
/// # Examples
/// ```
/// use bytes::Bytes;
/// use ember_web::{Method, Router, Status};
///
/// let mut router = Router::new();
/// router.install_route(Method::Get, "/user/([0-9]+)/name", |_req, resp, params| {
///     resp.set_body(Bytes::from(format!("user #{}", params[0])));
///     Status::Ok
/// });
/// ```
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
    fallback: Option<RouteAction>,
}

impl Router {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a route. Routes match in the order they were installed.
    ///
    /// # Panics
    ///
    /// Panics when `pattern` is not a valid regular expression — route
    /// tables are wired at startup and a bad pattern is a bug, not input.
    pub fn install_route<A>(&mut self, method: Method, pattern: &str, action: A)
    where
        A: Fn(&Request, &mut Responder, &[&str]) -> Status + Send + Sync + 'static,
    {
        let anchored = Regex::new(&format!("^(?:{pattern})$"))
            .unwrap_or_else(|e| panic!("invalid route pattern {pattern:?}: {e}"));

        self.routes.push(Route {
            method,
            pattern: anchored,
            action: Box::new(action),
        });
    }

    /// Installs the action invoked when no route matches.
    pub fn install_default<A>(&mut self, action: A)
    where
        A: Fn(&Request, &mut Responder, &[&str]) -> Status + Send + Sync + 'static,
    {
        self.fallback = Some(Box::new(action));
    }

    fn run(
        action: &RouteAction,
        request: &Request,
        responder: &mut Responder,
        params: &[&str],
    ) -> Control {
        let status = action(request, responder, params);

        if !responder.is_sent() {
            responder.send(status);
        }

        match responder.keep_alive() {
            true => Control::KeepAlive,
            false => Control::Close,
        }
    }
}

impl Handler for Router {
    async fn handle(&self, request: &Request, responder: &mut Responder) -> Control {
        // The channel has already screened the method; a non-UTF-8 URI can
        // never match a pattern and falls through to the default.
        if let (Ok(method), Some(uri)) = (request.method(), request.uri_str()) {
            for route in &self.routes {
                if route.method != method {
                    continue;
                }

                let Some(captures) = route.pattern.captures(uri) else {
                    continue;
                };

                let params: Vec<&str> = captures
                    .iter()
                    .skip(1)
                    .flatten()
                    .map(|m| m.as_str())
                    .collect();

                return Self::run(&route.action, request, responder, &params);
            }
        }

        match &self.fallback {
            Some(action) => Self::run(action, request, responder, &[]),
            None => {
                responder.send(Status::NotFound);
                Control::KeepAlive
            }
        }
    }
}
