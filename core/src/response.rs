use bytes::Bytes;
use hyper::{
    header::{HeaderName, CONTENT_TYPE},
    http::HeaderValue,
    HeaderMap, StatusCode,
};

/// Builder for Response struct.
#[derive(Default, Debug)]
pub struct ResponseBuilder {
    response: Response,
}

impl ResponseBuilder {
    /// Sets status field.
    pub fn status(&mut self, status: u16) -> &mut Self {
        self.response.status = status;
        self
    }

    /// Add single header to headers field.
    /// Call multiple times for multiple headers.
    pub fn header(&mut self, key: HeaderName, value: HeaderValue) -> &mut Self {
        self.response.headers.insert(key, value);
        self
    }

    /// Shorthand for the `Content-Type` header.
    pub fn content_type(&mut self, value: &'static str) -> &mut Self {
        self.header(CONTENT_TYPE, HeaderValue::from_static(value))
    }

    /// Sets body field.
    pub fn body(&mut self, body: impl Into<Bytes>) -> &mut Self {
        self.response.body = body.into();
        self
    }

    /// Returns built Response leaving empty at that place.
    pub fn finalize(&mut self) -> Response {
        std::mem::take(&mut self.response)
    }
}

/// Response produced for a single request.
///
/// * A status code. Any value a test asks for is allowed, so it is kept as a
///   plain integer instead of a `StatusCode`.
/// * HTTP headers, written in the order they were added.
/// * A body, possibly empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// HTTP status returned.
    pub status: u16,

    /// HTTP headers returned.
    pub headers: HeaderMap,

    /// HTTP body content returned.
    pub body: Bytes,
}

impl Response {
    pub fn build() -> ResponseBuilder {
        ResponseBuilder::default()
    }

    /// Plain text response, used for diagnostics.
    pub fn plain(status: u16, body: impl Into<Bytes>) -> Self {
        Self::build()
            .status(status)
            .content_type("text/plain")
            .body(body)
            .finalize()
    }

    /// Header value as a string, `None` when missing or not visible ASCII.
    pub fn header(&self, key: impl AsRef<str>) -> Option<&str> {
        self.headers.get(key.as_ref())?.to_str().ok()
    }

    /// Reason phrase for the status line. Codes without a registered reason
    /// get an empty phrase.
    pub fn reason(&self) -> &'static str {
        StatusCode::from_u16(self.status)
            .ok()
            .and_then(|status| status.canonical_reason())
            .unwrap_or_default()
    }
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: 200,
            headers: HeaderMap::default(),
            body: Bytes::new(),
        }
    }
}

/// Serializes the response as HTTP/1.1. Every response closes the connection,
/// so `Content-Length` and `Connection: close` are always appended.
impl From<Response> for Vec<u8> {
    fn from(response: Response) -> Self {
        use std::io::Write as _; // import without risk of name clashing

        let mut buf: Vec<u8> = Vec::with_capacity(128 + response.body.len());

        let _ = write!(&mut buf, "HTTP/1.1 {} {}\r\n", response.status, response.reason());

        for (k, v) in response.headers.iter() {
            let _ = write!(&mut buf, "{}: ", k);
            buf.extend_from_slice(v.as_bytes());
            buf.extend_from_slice(b"\r\n");
        }

        let _ = write!(
            &mut buf,
            "content-length: {}\r\nconnection: close\r\n\r\n",
            response.body.len()
        );
        buf.extend_from_slice(&response.body);

        buf
    }
}

#[cfg(test)]
mod tests {
    use super::Response;
    use hyper::{
        header::{LAST_MODIFIED, SET_COOKIE},
        http::HeaderValue,
    };

    #[test]
    fn test_response_to_bytes() {
        let response = Response::build()
            .status(200)
            .content_type("text/plain")
            .header(LAST_MODIFIED, HeaderValue::from_static("thursday"))
            .header(SET_COOKIE, HeaderValue::from_static("TestCookie=a.xml"))
            .body("hello")
            .finalize();

        let bytes: Vec<u8> = response.into();
        assert_eq!(
            std::str::from_utf8(&bytes).unwrap(),
            "HTTP/1.1 200 OK\r\n\
             content-type: text/plain\r\n\
             last-modified: thursday\r\n\
             set-cookie: TestCookie=a.xml\r\n\
             content-length: 5\r\n\
             connection: close\r\n\
             \r\n\
             hello"
        );
    }

    #[test]
    fn test_unregistered_status_has_empty_reason() {
        let bytes: Vec<u8> = Response::build().status(599).finalize().into();

        assert!(std::str::from_utf8(&bytes)
            .unwrap()
            .starts_with("HTTP/1.1 599 \r\n"));
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = Response::plain(404, "File Not Found: /a");

        assert_eq!(response.header("Content-Type"), Some("text/plain"));
        assert_eq!(response.header("content-type"), Some("text/plain"));
        assert_eq!(response.header("Location"), None);
        assert_eq!(response.reason(), "Not Found");
    }
}
