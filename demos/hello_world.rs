use bytes::Bytes;
use ember_web::{bind_endpoint, Method, Router, Server, Status};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    let mut router = Router::new();
    router.install_route(Method::Get, "/", |_req, resp, _params| {
        resp.set_field("Content-Type", "text/plain");
        resp.set_body(Bytes::from_static(b"Hello, world!"));
        Status::Ok
    });

    Server::builder()
        .listener(bind_endpoint("127.0.0.1:8080".parse().unwrap(), 128).unwrap())
        .handler(router)
        .build()
        .launch()
        .await;
}
