use crate::http::ContentRange;
use anyhow::Context;
use bytes::Bytes;
use hyper::{
    header::{HeaderName, AUTHORIZATION, CONTENT_RANGE, HOST, IF_MODIFIED_SINCE},
    http::HeaderValue,
    Body, HeaderMap,
};

/// Trait is implemented for types that can be turned from HeaderMap by specific key.
///
/// ```rust
/// use hyper::{header::HOST, HeaderMap};
/// use stubhttp_core::request::{Host, TypedHeader};
///
/// let mut map = HeaderMap::new();
/// map.insert(HOST, "localhost:8080".parse().unwrap());
///
/// let Host(host) = Host::try_from_header_map(&map).unwrap();
/// assert_eq!(host, "localhost:8080");
/// ```
pub trait TypedHeader: Sized {
    /// Returns header's key.
    fn key() -> HeaderName;

    /// Tries to create Self from HeaderValue.
    fn try_from_header_value(header_value: &HeaderValue) -> anyhow::Result<Self>;

    /// Default implementation that uses `key` and `try_from_header_value` functions
    /// to turn `map: HeaderMap<HeaderValue>` into `anyhow::Result<Self>`.
    fn try_from_header_map(map: &HeaderMap<HeaderValue>) -> anyhow::Result<Self> {
        Self::try_from_header_value(map.get(Self::key()).context("header not found")?)
    }

    /// Like `try_from_header_map`, but a missing or malformed header is `None`.
    fn from_header_map(map: &HeaderMap<HeaderValue>) -> Option<Self> {
        Self::try_from_header_map(map).ok()
    }
}

/// Macro for faster TypedHeader implementations.
macro_rules! derive_header {
    ($type:ident(_), name: $name:expr) => {
        impl TypedHeader for $type {
            fn key() -> HeaderName {
                $name
            }

            fn try_from_header_value(header_value: &HeaderValue) -> anyhow::Result<Self> {
                Ok($type(header_value.to_str()?.to_string()))
            }
        }
    };
}

pub struct Authorization(pub String);
derive_header!(Authorization(_), name: AUTHORIZATION);

pub struct Host(pub String);
derive_header!(Host(_), name: HOST);

pub struct IfModifiedSince(pub String);
derive_header!(IfModifiedSince(_), name: IF_MODIFIED_SINCE);

/// `X-HTTP-Method-Override`, lets a POST stand in for another verb.
pub struct MethodOverride(pub String);
derive_header!(
    MethodOverride(_),
    name: HeaderName::from_static("x-http-method-override")
);

impl TypedHeader for ContentRange {
    fn key() -> HeaderName {
        CONTENT_RANGE
    }

    fn try_from_header_value(header_value: &HeaderValue) -> anyhow::Result<Self> {
        header_value.to_str()?.parse()
    }
}

/// Key/value pairs from a query string or a form-encoded body.
///
/// Lookups return the first value for a key, or an empty string when the key
/// is missing. A newline ends a value the same way `&` does. Values are kept
/// as sent: `%XX` escapes and `+` are not decoded, so `Passwd=b%61d` is not
/// the password `bad`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FormFields(Vec<(String, String)>);

impl FormFields {
    pub fn parse(input: &str) -> Self {
        let fields = input
            .split(|c| c == '&' || c == '\n')
            .filter_map(|pair| pair.split_once('='))
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        Self(fields)
    }

    pub fn from_bytes(input: &[u8]) -> Self {
        Self::parse(&String::from_utf8_lossy(input))
    }

    pub fn get(&self, key: &str) -> &str {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .unwrap_or_default()
    }
}

/// Collects whole request body.
pub fn read_body(body: Body) -> anyhow::Result<Bytes> {
    Ok(futures_executor::block_on(hyper::body::to_bytes(body))?)
}

#[cfg(test)]
mod tests {
    use super::{Authorization, FormFields, MethodOverride, TypedHeader};
    use crate::http::ContentRange;
    use hyper::{header::CONTENT_RANGE, HeaderMap};

    #[test]
    fn test_form_fields_first_match_wins() {
        let form = FormFields::parse("Passwd=one&Passwd=two&service=cl");

        assert_eq!(form.get("Passwd"), "one");
        assert_eq!(form.get("service"), "cl");
        assert_eq!(form.get("missing"), "");
    }

    #[test]
    fn test_form_fields_values_are_not_decoded() {
        let form = FormFields::parse("Email=a%40b.com&Passwd=b%61d&token=a+b&status=%35%30%33");

        assert_eq!(form.get("Email"), "a%40b.com");
        assert_eq!(form.get("Passwd"), "b%61d");
        assert_eq!(form.get("token"), "a+b");
        assert_eq!(form.get("status"), "%35%30%33");
    }

    #[test]
    fn test_form_fields_value_keeps_later_equals() {
        let form = FormFields::parse("Passwd=a=b&flag");

        assert_eq!(form.get("Passwd"), "a=b");
        assert_eq!(form.get("flag"), "");
    }

    #[test]
    fn test_form_fields_newline_ends_value() {
        let form = FormFields::from_bytes(b"Passwd=captcha\nlogintoken=CapToken&logincaptcha=good\n");

        assert_eq!(form.get("Passwd"), "captcha");
        assert_eq!(form.get("logintoken"), "CapToken");
        assert_eq!(form.get("logincaptcha"), "good");
    }

    #[test]
    fn test_form_fields_empty_value() {
        let form = FormFields::parse("Passwd=&status=");

        assert_eq!(form.get("Passwd"), "");
        assert_eq!(form.get("status"), "");
    }

    #[test]
    fn test_typed_headers() {
        let mut map = HeaderMap::new();
        map.insert("authorization", "AuthSub token=x".parse().unwrap());
        map.insert("x-http-method-override", "DELETE".parse().unwrap());
        map.insert(CONTENT_RANGE, "bytes */10".parse().unwrap());

        let Authorization(auth) = Authorization::try_from_header_map(&map).unwrap();
        assert_eq!(auth, "AuthSub token=x");

        let MethodOverride(method) = MethodOverride::try_from_header_map(&map).unwrap();
        assert_eq!(method, "DELETE");

        assert_eq!(
            ContentRange::from_header_map(&map),
            Some(ContentRange::Query { total: 10 })
        );
    }

    #[test]
    fn test_malformed_content_range_is_none() {
        let mut map = HeaderMap::new();
        map.insert(CONTENT_RANGE, "bytes nonsense".parse().unwrap());

        assert_eq!(ContentRange::from_header_map(&map), None);
        assert_eq!(ContentRange::from_header_map(&HeaderMap::new()), None);
    }
}
