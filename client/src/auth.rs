//! `Basic` authentication scheme.

use base64::{Engine, engine::general_purpose::STANDARD};
use sha1::{Digest, Sha1};

use crate::{
    named::Header,
    request::Request,
    response::{Response, ResponseBuilder, code},
};

/// name of request header carrying credentials.
pub const AUTHORIZATION: &str = "Authorization";

/// name of response header carrying authentication challenge.
pub const WWW_AUTHENTICATE: &str = "WWW-Authenticate";

const SCHEME: &str = "Basic";

/// the standard (insecure) `Basic` scheme.
#[derive(Clone, Debug, Default)]
pub struct BasicAuth {
    realm: String,
}

impl BasicAuth {
    /// scheme with given realm. an empty realm is allowed.
    pub fn new(realm: impl Into<String>) -> Self {
        Self { realm: realm.into() }
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// value of `Authorization` header for given credentials. both are trimmed before encoding.
    pub fn header_value(user: &str, secret: &str) -> String {
        let credential = format!("{}:{}", user.trim(), secret.trim());
        format!("{SCHEME} {}", STANDARD.encode(credential))
    }

    /// a copy of request with `Authorization` header set. given request is left untouched.
    pub fn add_auth(&self, req: &Request, user: &str, secret: &str) -> Request {
        req.add_headers([Header::new(AUTHORIZATION, Self::header_value(user, secret))])
    }

    /// request carries credentials of this scheme.
    pub fn has_credentials(&self, req: &Request) -> bool {
        credential(req).is_some()
    }

    /// user id from credentials of request. `None` when credentials are absent or malformed.
    pub fn user_id(&self, req: &Request) -> Option<String> {
        let decoded = decode(credential(req)?)?;
        match decoded.find(':') {
            Some(idx) if idx > 0 => Some(decoded[..idx].to_owned()),
            _ => None,
        }
    }

    /// check credentials of request against expected user and secret.
    ///
    /// `None` when request is authorized. otherwise an unauthorized response carrying the
    /// challenge of this scheme.
    pub fn authenticate(&self, req: &Request, user: &str, secret: &str) -> Option<Response> {
        let Some(value) = req.header_value(AUTHORIZATION).filter(|v| !v.is_empty()) else {
            return Some(self.unauthorized("Authorization Required"));
        };

        let Some(credential) = strip_scheme(value) else {
            return Some(self.unauthorized("Invalid scheme"));
        };

        let decoded = match decode(credential) {
            Some(decoded) if decoded.find(':').is_some_and(|idx| idx > 0) => decoded,
            _ => return Some(self.unauthorized("Invalid format")),
        };

        let received = Sha1::digest(decoded.as_bytes());
        let expected = Sha1::new()
            .chain_update(user)
            .chain_update(":")
            .chain_update(secret)
            .finalize();

        (received != expected).then(|| self.unauthorized("Authorization Required"))
    }

    /// unauthorized response with challenge of this scheme and given message as body.
    pub fn unauthorized(&self, message: &str) -> Response {
        ResponseBuilder::new(code::UNAUTHORIZED)
            .header(WWW_AUTHENTICATE, format!("{SCHEME} realm={}", self.realm))
            .body(message.to_owned())
            .create()
    }
}

fn credential(req: &Request) -> Option<&str> {
    req.header_value(AUTHORIZATION).and_then(strip_scheme)
}

// strip case insensitive `basic ` prefix.
fn strip_scheme(value: &str) -> Option<&str> {
    let prefix = value.get(..SCHEME.len() + 1)?;
    prefix
        .eq_ignore_ascii_case("basic ")
        .then(|| value[prefix.len()..].trim())
}

fn decode(credential: &str) -> Option<String> {
    let bytes = STANDARD.decode(credential).ok()?;
    Some(String::from_utf8_lossy(&bytes).trim().to_owned())
}
