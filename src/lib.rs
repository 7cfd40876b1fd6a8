//! ember_web - Embeddable zero-copy HTTP/1.1 server library
//!
//! A small HTTP/1.1 core with the orchestration needed to embed it: a
//! delimiter-driven tokenizer, a zero-copy request parser, a response framer
//! with cached replay and resumable partial flushing, and a worker-pool
//! server wired through a regex router.
//!
//! # Design
//!
//! - **Zero-copy parsing** - every parsed value (method, URI, headers,
//!   cookies, body) is a view into the request's pooled buffer; nothing is
//!   copied out during recognition
//! - **Bounded resources** - fixed-capacity delimiter tables, pooled
//!   fixed-size request buffers, a fixed worker pool
//! - **Cooperative output** - responses drain through bounded, resumable
//!   flush calls against a non-blocking sink; a slow peer never parks a
//!   worker inside a write
//! - **Cached replay** - hot responses (error pages, health checks) are
//!   serialized once and replayed byte-for-byte across connections
//!
//! # Examples
//!
//! Quick start:
//! ```no_run
//! use bytes::Bytes;
//! use ember_web::{bind_endpoint, Method, Router, Server, Status};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut router = Router::new();
//!     router.install_route(Method::Get, "/hello/(.+)", |_req, resp, params| {
//!         resp.set_field("Content-Type", "text/plain");
//!         resp.set_body(Bytes::from(format!("Hello, {}!", params[0])));
//!         Status::Ok
//!     });
//!
//!     Server::builder()
//!         .listener(bind_endpoint("127.0.0.1:8080".parse().unwrap(), 128).unwrap())
//!         .handler(router)
//!         .build()
//!         .launch()
//!         .await;
//! }
//! ```
//!
//! The parsing core also works standalone, without the server around it:
//! ```
//! use ember_web::Parser;
//!
//! let raw = b"GET /res HTTP/1.1\r\nHost: example.com\r\nCookie: sid=42\r\n\r\n";
//! let mut parser = Parser::new(raw);
//! parser.parse();
//!
//! assert_eq!(parser.uri().unwrap(), b"/res");
//! assert_eq!(parser.cookie(b"sid").unwrap(), b"42");
//! ```

pub(crate) mod http {
    pub(crate) mod lexer;
    pub(crate) mod parser;
    pub(crate) mod request;
    pub(crate) mod responder;
    pub(crate) mod types;
}
pub(crate) mod server {
    pub(crate) mod channel;
    pub(crate) mod router;
    pub(crate) mod server_impl;
}
pub(crate) mod errors;
pub(crate) mod pool;
pub mod limits;

pub use crate::{
    errors::ErrorKind,
    http::{
        lexer::{Lexer, DELIMITER_STORAGE, MAX_DELIMITERS},
        parser::Parser,
        request::Request,
        responder::{CachedResponse, CookieOptions, OutputSink, Responder},
        types::{Method, Status, Version},
    },
    pool::{BufferPool, PooledBuffer},
    server::{
        channel::{Channel, Control, Handler},
        router::Router,
        server_impl::{bind_endpoint, Server, ServerBuilder},
    },
};
