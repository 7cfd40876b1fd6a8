use bytes::Bytes;
use ember_web::{
    bind_endpoint, limits::ServerLimits, CookieOptions, Method, Responder, Router, Server, Status,
};
use std::time::Duration;

fn greeting_page(name: &str) -> Bytes {
    Bytes::from(format!("<b>Hello, {name}</b>\n"))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    // The 404 page is serialized once and replayed for every miss.
    let mut scratch = Responder::new();
    scratch.set_field("Content-Type", "text/html");
    scratch.set_body(Bytes::from_static(b"<h1>404 Not Found</h1>\n"));
    let not_found = scratch.cache_as(Status::NotFound);

    let mut router = Router::new();

    router.install_route(Method::Get, "/hello/(.+)", |req, resp, params| {
        resp.set_field("Content-Type", "text/html");

        if req.cookie(b"Session").is_err() {
            resp.set_cookie_with(
                "Session",
                "fresh",
                &CookieOptions {
                    path: Some("/".to_string()),
                    max_age: Some(Duration::from_secs(3600)),
                    http_only: true,
                    ..CookieOptions::default()
                },
            );
        }

        resp.set_body(greeting_page(params[0]));
        Status::Ok
    });

    router.install_default(move |_req, resp, _params| {
        resp.send_cached(not_found.clone());
        resp.status()
    });

    Server::builder()
        .listener(bind_endpoint("127.0.0.1:3000".parse().unwrap(), 128).unwrap())
        .handler(router)
        .server_limits(ServerLimits {
            workers: 1,
            ..ServerLimits::default()
        })
        .build()
        .launch()
        .await;
}
