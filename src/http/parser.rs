//! HTTP/1.1 request recognition over phased lexer passes.

use crate::{errors::ErrorKind, http::lexer::Lexer};
use std::sync::OnceLock;

// Delimiter sets for each tokenizing phase. Compound line boundaries are
// registered before their prefixes so CRLF wins over lone CR or LF.
const REQUEST_LINE_DELIMITERS: &[&[u8]] = &[b" ", b"\t", b"\r", b"\n"];
const FIELD_KEY_DELIMITERS: &[&[u8]] = &[b" ", b"\t", b":"];
const LINE_DELIMITERS: &[&[u8]] = &[b"\r\n", b"\r", b"\n"];
const COOKIE_DELIMITERS: &[&[u8]] = &[b"=", b";", b",", b" ", b"\t"];

/// A half-open byte range into the parse buffer.
///
/// Parse results are stored as offsets instead of references so a buffer
/// owner ([`Request`](crate::Request)) can keep the tables alongside the
/// buffer and resolve them to borrows on access.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Span {
    start: usize,
    len: usize,
}

impl Span {
    #[inline(always)]
    pub(crate) fn of<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.start..self.start + self.len]
    }
}

/// Span-based parse results: request line slots, header table, lazy cookie
/// table, body range.
///
/// Header keys are exact-byte and case-sensitive; inserting a duplicate key
/// overwrites the previous value in place. Cookies are materialized on first
/// access by re-tokenizing the `Cookie` header value.
#[derive(Debug, Default)]
pub(crate) struct ParsedTables {
    method: Option<Span>,
    uri: Option<Span>,
    version: Option<Span>,
    fields: Vec<(Span, Span)>,
    cookies: OnceLock<Vec<(Span, Span)>>,
    body: Span,
}

impl ParsedTables {
    /// Recognizes the request structure in `buf`.
    ///
    /// Phase one tokenizes the request line, phase two loops over header
    /// lines until the blank line, phase three consumes the blank line so the
    /// body range starts at the first body byte. Malformed input is handled
    /// leniently: a missing boundary turns the remaining bytes into the final
    /// token of the current phase.
    pub(crate) fn parse(&mut self, buf: &[u8]) {
        debug_assert!(self.method.is_none(), "parse() is single-use per buffer");

        let mut lexer = Lexer::new(buf);

        // Request line.
        lexer.set_delimiters(REQUEST_LINE_DELIMITERS);
        self.method = Some(Self::token_span(&mut lexer, true));
        self.uri = Some(Self::token_span(&mut lexer, true));
        self.version = Some(Self::token_span(&mut lexer, true));

        // Header lines, until the blank line.
        loop {
            let mut peek = lexer.clone();
            peek.set_delimiters(LINE_DELIMITERS);
            if peek.next(false).is_empty() {
                break;
            }

            lexer.set_delimiters(FIELD_KEY_DELIMITERS);
            let key = Self::token_span(&mut lexer, true);

            // Non-compressing read keeps the raw value bytes intact.
            lexer.set_delimiters(LINE_DELIMITERS);
            let value = Self::token_span(&mut lexer, false);

            Self::insert(&mut self.fields, buf, key, value);
        }

        // Exactly one boundary separates headers from body.
        lexer.set_delimiters(LINE_DELIMITERS);
        lexer.next(false);

        self.body = Span {
            start: lexer.consumption(),
            len: buf.len() - lexer.consumption(),
        };
    }

    #[inline]
    fn token_span(lexer: &mut Lexer<'_>, compress: bool) -> Span {
        let start = lexer.consumption();
        let token = lexer.next(compress);

        Span {
            start,
            len: token.len(),
        }
    }

    fn insert(fields: &mut Vec<(Span, Span)>, buf: &[u8], key: Span, value: Span) {
        match fields.iter_mut().find(|(k, _)| k.of(buf) == key.of(buf)) {
            Some(entry) => entry.1 = value,
            None => fields.push((key, value)),
        }
    }

    pub(crate) fn method(&self) -> Result<Span, ErrorKind> {
        self.method.ok_or(ErrorKind::FieldNotFound)
    }

    pub(crate) fn uri(&self) -> Result<Span, ErrorKind> {
        self.uri.ok_or(ErrorKind::FieldNotFound)
    }

    pub(crate) fn version(&self) -> Result<Span, ErrorKind> {
        self.version.ok_or(ErrorKind::FieldNotFound)
    }

    pub(crate) fn field(&self, buf: &[u8], name: &[u8]) -> Result<Span, ErrorKind> {
        self.fields
            .iter()
            .find(|(key, _)| key.of(buf) == name)
            .map(|(_, value)| *value)
            .ok_or(ErrorKind::FieldNotFound)
    }

    pub(crate) fn cookie(&self, buf: &[u8], name: &[u8]) -> Result<Span, ErrorKind> {
        self.cookie_table(buf)
            .iter()
            .find(|(key, _)| key.of(buf) == name)
            .map(|(_, value)| *value)
            .ok_or(ErrorKind::CookieNotFound)
    }

    pub(crate) fn cookie_names(&self, buf: &[u8]) -> Vec<Span> {
        self.cookie_table(buf).iter().map(|(key, _)| *key).collect()
    }

    #[inline(always)]
    pub(crate) fn body(&self) -> Span {
        self.body
    }

    /// Materializes the cookie table on first access. A request without a
    /// `Cookie` header yields an empty table.
    fn cookie_table(&self, buf: &[u8]) -> &[(Span, Span)] {
        self.cookies.get_or_init(|| {
            let Ok(header) = self.field(buf, b"Cookie") else {
                return Vec::new();
            };

            let mut lexer = Lexer::new(header.of(buf));
            lexer.set_delimiters(COOKIE_DELIMITERS);

            let mut table = Vec::new();

            while !lexer.end_of_stream() {
                let name_start = header.start + lexer.consumption();
                let name_len = lexer.next(true).len();
                let value_start = header.start + lexer.consumption();
                let value_len = lexer.next(true).len();

                Self::insert(
                    &mut table,
                    buf,
                    Span {
                        start: name_start,
                        len: name_len,
                    },
                    Span {
                        start: value_start,
                        len: value_len,
                    },
                );
            }

            table
        })
    }
}

/// Zero-copy HTTP/1.1 request parser.
///
/// Recognizes the request line, the header block, and the header/body
/// boundary of a buffered request using phased [`Lexer`] passes, then hands
/// out every result as a subslice of the original buffer: the method, the
/// URI, the version, each header name and value, each cookie, and the body.
/// Nothing is copied and nothing is allocated beyond the lookup tables.
///
/// Header names match by exact byte sequence; duplicates resolve
/// last-write-wins. Cookies parse lazily on first access. Grammar validation
/// is intentionally absent: truncated input turns into truncated tokens, and
/// deciding what is acceptable belongs to the caller.
///
/// A parser is single-use: parse one buffer, query it, drop it.
///
/// # Examples
/// ```
/// use ember_web::Parser;
///
/// let raw = b"GET /status HTTP/1.1\r\nHost: example.com\r\n\r\n";
/// let mut parser = Parser::new(raw);
/// parser.parse();
///
/// assert_eq!(parser.method().unwrap(), b"GET");
/// assert_eq!(parser.uri().unwrap(), b"/status");
/// assert_eq!(parser.field(b"Host").unwrap(), b"example.com");
/// ```
#[derive(Debug)]
pub struct Parser<'a> {
    buf: &'a [u8],
    tables: ParsedTables,
}

impl<'a> Parser<'a> {
    /// Creates a parser over a fully buffered request.
    #[inline]
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            tables: ParsedTables::default(),
        }
    }

    /// Runs the parsing phases. Must be called before any accessor.
    #[inline]
    pub fn parse(&mut self) {
        let buf = self.buf;
        self.tables.parse(buf);
    }

    /// The request-line method token.
    ///
    /// Fails with [`ErrorKind::FieldNotFound`] only when [`parse`](Self::parse)
    /// was never invoked.
    #[inline]
    pub fn method(&self) -> Result<&'a [u8], ErrorKind> {
        Ok(self.tables.method()?.of(self.buf))
    }

    /// The request-line URI token.
    #[inline]
    pub fn uri(&self) -> Result<&'a [u8], ErrorKind> {
        Ok(self.tables.uri()?.of(self.buf))
    }

    /// The request-line protocol version token.
    #[inline]
    pub fn protocol_version(&self) -> Result<&'a [u8], ErrorKind> {
        Ok(self.tables.version()?.of(self.buf))
    }

    /// Looks up a header field by exact byte name.
    #[inline]
    pub fn field(&self, name: &[u8]) -> Result<&'a [u8], ErrorKind> {
        Ok(self.tables.field(self.buf, name)?.of(self.buf))
    }

    /// Looks up a cookie by name, parsing the `Cookie` header on first call.
    #[inline]
    pub fn cookie(&self, name: &[u8]) -> Result<&'a [u8], ErrorKind> {
        Ok(self.tables.cookie(self.buf, name)?.of(self.buf))
    }

    /// The names of every cookie, in order of appearance.
    pub fn cookie_names(&self) -> Vec<&'a [u8]> {
        self.tables
            .cookie_names(self.buf)
            .into_iter()
            .map(|span| span.of(self.buf))
            .collect()
    }

    /// The unconsumed remainder of the buffer: the raw body region.
    ///
    /// The caller is responsible for limiting reads to the declared
    /// `Content-Length`.
    #[inline]
    pub fn body(&self) -> &'a [u8] {
        self.tables.body().of(self.buf)
    }
}
