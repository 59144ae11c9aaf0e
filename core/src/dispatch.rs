//! Request dispatcher.
//!
//! Every request walks the same chain of rules. A rule either answers the
//! request (and nothing after it runs) or forwards it, sometimes after
//! rewriting the effective target or command:
//!
//! 1. suffix markers: `.authwww`, `.auth`, `.authsub` gates and the
//!    `.location` / `.upload` resumable upload negotiation,
//! 2. `X-HTTP-Method-Override` on POST,
//! 3. `/accounts/ClientLogin` sign-in,
//! 4. DELETE,
//! 5. `?status=N` and `?statusxml=N` forced failures,
//! 6. `If-Modified-Since` matching [`MODIFIED_DATE`],
//!
//! and finally the file fetch, which always answers.
//!
//! The dispatcher keeps no state between requests; everything it decides
//! comes from the request and the two collaborators it was built with.

use crate::{
    handler::Service,
    http::{
        basic_credentials, ContentRange, PathSuffix, AUTHSUB_TOKEN, CLIENT_LOGIN_PATH,
        DEFAULT_CONTENT_TYPE, GDATA_ERROR_CONTENT_TYPE, GOOGLE_LOGIN_TOKEN, MODIFIED_DATE,
        SIGN_IN_BAD_AUTHENTICATION, SIGN_IN_CAPTCHA_REQUIRED, SIGN_IN_SUCCESS,
        WWW_AUTHENTICATE_REALM, WWW_PASSWORD, WWW_USER,
    },
    outcome::Outcome,
    request::{
        read_body, Authorization, FormFields, Host, IfModifiedSince, MethodOverride, TypedHeader,
    },
    response::Response,
    store::{DirectoryStore, FileStore, GuessMime, MimeLookup},
};
use bytes::Bytes;
use hyper::{
    header::{CONTENT_TYPE, LAST_MODIFIED, LOCATION, RANGE, SET_COOKIE, WWW_AUTHENTICATE},
    http::HeaderValue,
    Body, HeaderMap, Request,
};
use log::debug;

/// The request as the rules see it. `target` and `command` start out as the
/// request line's target and method and are rewritten by the rules.
#[derive(Debug)]
struct Exchange {
    target: String,
    command: String,
    headers: HeaderMap,
    body: Bytes,
}

impl Exchange {
    /// Target without its query string.
    fn path(&self) -> &str {
        self.target
            .split_once('?')
            .map_or(self.target.as_str(), |(path, _)| path)
    }

    fn query(&self) -> FormFields {
        self.target
            .split_once('?')
            .map(|(_, query)| FormFields::parse(query))
            .unwrap_or_default()
    }

    /// Last segment of the path, used as the `TestCookie` value.
    fn basename(&self) -> &str {
        self.path().rsplit('/').next().unwrap_or_default()
    }

    fn authorized(&self, expected: &str) -> bool {
        matches!(
            Authorization::from_header_map(&self.headers),
            Some(Authorization(value)) if value == expected
        )
    }

    fn strip(&mut self, suffix: PathSuffix) {
        let stripped = suffix.strip(&self.target).len();
        self.target.truncate(stripped);
    }
}

type Rule<S, M> = fn(&Dispatcher<S, M>, &mut Exchange) -> anyhow::Result<Outcome>;

/// Maps each request onto a scripted response.
///
/// ```rust
/// use hyper::{Body, Request};
/// use stubhttp_core::{dispatch::Dispatcher, testing::MemoryStore};
///
/// let dispatcher = Dispatcher::new(MemoryStore::default(), stubhttp_core::store::GuessMime);
/// let request = Request::delete("/anything").body(Body::empty()).unwrap();
///
/// assert_eq!(dispatcher.dispatch(request).unwrap().status, 200);
/// ```
#[derive(Debug, Clone)]
pub struct Dispatcher<S = DirectoryStore, M = GuessMime> {
    store: S,
    mime: M,
    www_credentials: String,
}

impl<S, M> Dispatcher<S, M>
where
    S: FileStore,
    M: MimeLookup,
{
    pub fn new(store: S, mime: M) -> Self {
        Self {
            store,
            mime,
            www_credentials: basic_credentials(WWW_USER, WWW_PASSWORD),
        }
    }

    /// Runs the rule chain for a single request.
    pub fn dispatch(&self, request: Request<Body>) -> anyhow::Result<Response> {
        let (parts, body) = request.into_parts();

        let mut exchange = Exchange {
            target: parts
                .uri
                .path_and_query()
                .map_or_else(|| parts.uri.path().to_string(), |pq| pq.as_str().to_string()),
            command: parts.method.as_str().to_string(),
            headers: parts.headers,
            body: read_body(body)?,
        };

        let rules: [(&str, Rule<S, M>); 6] = [
            ("suffix", Self::suffix),
            ("method override", Self::method_override),
            ("sign in", Self::sign_in),
            ("delete", Self::delete),
            ("forced status", Self::forced_status),
            ("not modified", Self::not_modified),
        ];

        for (name, rule) in rules {
            if let Outcome::Respond(response) = rule(self, &mut exchange)? {
                debug!(
                    "dispatch - {} rule answered {} {} with {}",
                    name, exchange.command, exchange.target, response.status
                );
                return Ok(response);
            }
        }

        self.fetch(&exchange)
    }

    /// Auth gates and resumable upload negotiation, driven by the marker the
    /// target ends with.
    fn suffix(&self, exchange: &mut Exchange) -> anyhow::Result<Outcome> {
        let suffix = match PathSuffix::detect(&exchange.target) {
            Some(suffix) => suffix,
            None => return Ok(Outcome::Forward),
        };

        match suffix {
            PathSuffix::AuthWww => {
                if !exchange.authorized(&self.www_credentials) {
                    return Ok(Response::build()
                        .status(401)
                        .header(
                            WWW_AUTHENTICATE,
                            HeaderValue::from_static(WWW_AUTHENTICATE_REALM),
                        )
                        .content_type("text/html")
                        .finalize()
                        .into());
                }
            }
            PathSuffix::Auth | PathSuffix::AuthSub => {
                let expected = if suffix == PathSuffix::Auth {
                    GOOGLE_LOGIN_TOKEN
                } else {
                    AUTHSUB_TOKEN
                };

                if !exchange.authorized(expected) {
                    return Ok(
                        Response::plain(401, format!("Unauthorized: {}", exchange.target)).into(),
                    );
                }
            }
            PathSuffix::Location => {
                let host = Host::from_header_map(&exchange.headers)
                    .map(|Host(host)| host)
                    .unwrap_or_default();
                let location = format!(
                    "http://{}{}{}",
                    host,
                    suffix.strip(&exchange.target),
                    PathSuffix::Upload
                );

                return Ok(Response::build()
                    .header(LOCATION, HeaderValue::from_str(&location)?)
                    .finalize()
                    .into());
            }
            PathSuffix::Upload => match ContentRange::from_header_map(&exchange.headers) {
                // arbitrary resume point, nothing is actually stored
                Some(ContentRange::Query { total }) => {
                    return Ok(resume_incomplete(total / 2)?.into());
                }
                Some(range @ ContentRange::Chunk { end, .. }) if range.expects_more() => {
                    return Ok(resume_incomplete(end)?.into());
                }
                Some(ContentRange::Chunk { .. }) => {}
                // without a usable range the marker stays on the target
                None => return Ok(Outcome::Forward),
            },
        }

        exchange.strip(suffix);
        Ok(Outcome::Forward)
    }

    fn method_override(&self, exchange: &mut Exchange) -> anyhow::Result<Outcome> {
        if exchange.command == "POST" {
            if let Some(MethodOverride(method)) = MethodOverride::from_header_map(&exchange.headers)
            {
                if !method.is_empty() {
                    exchange.command = method;
                }
            }
        }

        Ok(Outcome::Forward)
    }

    /// Sign-in succeeds unless the password is `bad`, or `captcha` without the
    /// expected captcha token and answer.
    fn sign_in(&self, exchange: &mut Exchange) -> anyhow::Result<Outcome> {
        if !exchange.target.ends_with(CLIENT_LOGIN_PATH) {
            return Ok(Outcome::Forward);
        }

        let form = FormFields::from_bytes(&exchange.body);

        let (status, body) = match form.get("Passwd") {
            "bad" => (403, SIGN_IN_BAD_AUTHENTICATION),
            "captcha"
                if form.get("logintoken") == "CapToken" && form.get("logincaptcha") == "good" =>
            {
                (200, SIGN_IN_SUCCESS)
            }
            "captcha" => (403, SIGN_IN_CAPTCHA_REQUIRED),
            _ => (200, SIGN_IN_SUCCESS),
        };

        Ok(self
            .success_tail(
                exchange,
                status,
                HeaderValue::from_static("text/plain"),
                Bytes::from_static(body.as_bytes()),
            )?
            .into())
    }

    fn delete(&self, exchange: &mut Exchange) -> anyhow::Result<Outcome> {
        if exchange.command != "DELETE" {
            return Ok(Outcome::Forward);
        }

        Ok(self
            .success_tail(exchange, 200, HeaderValue::from_static("text/plain"), Bytes::new())?
            .into())
    }

    /// `?status=N` fails with N and a plain diagnostic, `?statusxml=N` with N
    /// and a GData XML error document.
    fn forced_status(&self, exchange: &mut Exchange) -> anyhow::Result<Outcome> {
        let query = exchange.query();

        if let Ok(status) = query.get("status").parse::<u16>() {
            return Ok(Response::plain(
                status,
                format!("Test HTTP server status parameter: {}", exchange.target),
            )
            .into());
        }

        if let Ok(status) = query.get("statusxml").parse::<u16>() {
            return Ok(Response::build()
                .status(status)
                .content_type(GDATA_ERROR_CONTENT_TYPE)
                .body(gdata_error_document(status, &exchange.target))
                .finalize()
                .into());
        }

        Ok(Outcome::Forward)
    }

    fn not_modified(&self, exchange: &mut Exchange) -> anyhow::Result<Outcome> {
        match IfModifiedSince::from_header_map(&exchange.headers) {
            Some(IfModifiedSince(date)) if date == MODIFIED_DATE => {
                Ok(Response::build().status(304).finalize().into())
            }
            _ => Ok(Outcome::Forward),
        }
    }

    /// Default rule: return the stored file, or 404 when the store can't
    /// produce it.
    fn fetch(&self, exchange: &Exchange) -> anyhow::Result<Response> {
        let path = exchange.path();

        let content = match self.store.resolve(path) {
            Ok(content) => content,
            Err(e) => {
                debug!("fetch - {} not served: {:#}", path, e);
                return Ok(Response::plain(
                    404,
                    format!("File Not Found: {}", exchange.target),
                ));
            }
        };

        let content_type = match self.mime.guess_type(path) {
            Some(guess) => HeaderValue::from_str(&guess)?,
            None => HeaderValue::from_static(DEFAULT_CONTENT_TYPE),
        };

        self.success_tail(exchange, 200, content_type, content)
    }

    /// Headers shared by sign-in, delete and fetch responses: the content
    /// type, the opaque modification date and a cookie naming the file.
    fn success_tail(
        &self,
        exchange: &Exchange,
        status: u16,
        content_type: HeaderValue,
        body: Bytes,
    ) -> anyhow::Result<Response> {
        Ok(Response::build()
            .status(status)
            .header(CONTENT_TYPE, content_type)
            .header(LAST_MODIFIED, HeaderValue::from_static(MODIFIED_DATE))
            .header(
                SET_COOKIE,
                HeaderValue::from_str(&format!("TestCookie={}", exchange.basename()))?,
            )
            .body(body)
            .finalize())
    }
}

impl<S, M> Service<Request<Body>> for Dispatcher<S, M>
where
    S: FileStore,
    M: MimeLookup,
{
    type Response = anyhow::Result<Response>;

    fn call(&self, req: Request<Body>) -> Self::Response {
        self.dispatch(req)
    }
}

/// 308 telling an uploader that bytes up to `last` were received.
fn resume_incomplete(last: u64) -> anyhow::Result<Response> {
    Ok(Response::build()
        .status(308)
        .header(RANGE, HeaderValue::from_str(&format!("bytes=0-{}", last))?)
        .finalize())
}

fn gdata_error_document(status: u16, target: &str) -> String {
    format!(
        "<errors xmlns='http://schemas.google.com/g/2005'>\
         <error><domain>GData</domain><code>code_{}</code>\
         <internalReason>forced status error on path {}</internalReason>\
         <extendedHelp>http://help.com</extendedHelp>\
         <sendReport>http://report.com</sendReport></error>\
         </errors>",
        status, target
    )
}
