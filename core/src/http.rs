use anyhow::{bail, Context};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::{fmt::Display, str::FromStr};

/// Value sent as `Last-Modified` on every successful fetch. Clients are
/// expected to treat dates as opaque and echo it back in `If-Modified-Since`.
pub const MODIFIED_DATE: &str = "thursday";

/// `Authorization` value required for `.auth` targets.
pub const GOOGLE_LOGIN_TOKEN: &str = "GoogleLogin auth=GoodAuthToken";

/// `Authorization` value required for `.authsub` targets.
pub const AUTHSUB_TOKEN: &str = "AuthSub token=GoodAuthSubToken";

pub const WWW_USER: &str = "GoodWWWUser";
pub const WWW_PASSWORD: &str = "GoodWWWPassword";

/// Challenge sent back when `.authwww` credentials don't match.
pub const WWW_AUTHENTICATE_REALM: &str = "Basic realm='testrealm'";

pub const CLIENT_LOGIN_PATH: &str = "/accounts/ClientLogin";

pub const GDATA_ERROR_CONTENT_TYPE: &str = "application/vnd.google.gdata.error+xml";

/// Content type used when the MIME lookup has no guess for a path.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

pub const SIGN_IN_SUCCESS: &str = "SID=GoodSID\nLSID=GoodLSID\nAuth=GoodAuthToken\n";
pub const SIGN_IN_BAD_AUTHENTICATION: &str = "Error=BadAuthentication\n";
pub const SIGN_IN_CAPTCHA_REQUIRED: &str =
    "Error=CaptchaRequired\nCaptchaToken=CapToken\nCaptchaUrl=CapUrl\n";

/// Builds a `Basic` authorization value out of a user and password.
///
/// ```
/// use stubhttp_core::http::{basic_credentials, WWW_PASSWORD, WWW_USER};
///
/// assert_eq!(
///     basic_credentials(WWW_USER, WWW_PASSWORD),
///     "Basic R29vZFdXV1VzZXI6R29vZFdXV1Bhc3N3b3Jk"
/// );
/// ```
pub fn basic_credentials(user: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", user, password)))
}

/// Trailing markers that turn a plain fetch into an auth or upload simulation.
///
/// Only the first marker found (in [`PathSuffix::ALL`] order) is applied to a
/// request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSuffix {
    /// `.authwww`: HTTP Basic credentials for `GoodWWWUser:GoodWWWPassword`.
    AuthWww,

    /// `.auth`: Google login token.
    Auth,

    /// `.authsub`: AuthSub token.
    AuthSub,

    /// `.location`: asks where a resumable upload should be sent.
    Location,

    /// `.upload`: one chunk of a resumable upload.
    Upload,
}

impl PathSuffix {
    /// Markers in the order they are checked.
    pub const ALL: [PathSuffix; 5] = [
        PathSuffix::AuthWww,
        PathSuffix::Auth,
        PathSuffix::AuthSub,
        PathSuffix::Location,
        PathSuffix::Upload,
    ];

    pub fn marker(&self) -> &'static str {
        match *self {
            PathSuffix::AuthWww => ".authwww",
            PathSuffix::Auth => ".auth",
            PathSuffix::AuthSub => ".authsub",
            PathSuffix::Location => ".location",
            PathSuffix::Upload => ".upload",
        }
    }

    /// Returns the marker the request target ends with, if any.
    pub fn detect(target: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|suffix| target.ends_with(suffix.marker()))
    }

    /// Removes the marker from the end of `target`. Targets without the marker
    /// are returned unchanged.
    pub fn strip<'a>(&self, target: &'a str) -> &'a str {
        target.strip_suffix(self.marker()).unwrap_or(target)
    }
}

impl Display for PathSuffix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.marker())
    }
}

/// Parsed `Content-Range` request header of a resumable upload.
///
/// * `bytes */135681` asks the server where to resume.
/// * `bytes 0-49999/135681` carries one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentRange {
    Query { total: u64 },
    Chunk { start: u64, end: u64, total: u64 },
}

impl ContentRange {
    /// Whether more chunks are expected after this one.
    pub fn expects_more(&self) -> bool {
        match *self {
            ContentRange::Query { .. } => true,
            ContentRange::Chunk { end, total, .. } => end < total.saturating_sub(1),
        }
    }
}

impl FromStr for ContentRange {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let bytes = value
            .trim()
            .strip_prefix("bytes ")
            .with_context(|| format!("content range is not in bytes: {}", value))?;

        let (range, total) = bytes
            .split_once('/')
            .with_context(|| format!("content range has no total: {}", value))?;
        let total: u64 = total.parse()?;

        if range == "*" {
            return Ok(ContentRange::Query { total });
        }

        match range.split_once('-') {
            Some((start, end)) => Ok(ContentRange::Chunk {
                start: start.parse()?,
                end: end.parse()?,
                total,
            }),
            None => bail!("invalid content range: {}", value),
        }
    }
}
