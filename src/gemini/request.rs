use std::borrow::Cow;

use percent_encoding::percent_decode_str;
use url::Host;

use crate::config::Config;
use crate::gemini::error::RequestError;

/// The protocol's own scheme token.
pub const SCHEME: &str = "gemini";

/// A parsed request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// The trimmed request text as received.
    pub url: String,
    /// `None` when the client omitted the scheme (`//host/path`).
    pub scheme: Option<String>,
    /// Hostname, with IPv6 brackets removed.
    pub host: String,
    /// Explicit port, if the client gave one.
    pub port: Option<String>,
    /// Percent-decoded path, exactly as written: dot segments are kept.
    pub path: String,
    /// Carried through, never interpreted.
    pub query: Option<String>,
}

/// What to do with a request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validated {
    /// Resolve `path` under the content root.
    Resolve(Request),
    /// The target had no path; send the client to its directory form.
    Redirect(String),
}

/// Components of a request line, sliced from the text as written.
///
/// Nothing here is normalized: the port is the literal digit string, the
/// host keeps its case and brackets, and the path keeps its dot segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrlParts<'a> {
    pub scheme: Option<&'a str>,
    /// Host as written, IPv6 brackets included. Empty when absent.
    pub host: &'a str,
    /// Port digits after the host; `None` when absent or empty.
    pub port: Option<&'a str>,
    pub path: &'a str,
    pub query: Option<&'a str>,
}

impl<'a> UrlParts<'a> {
    /// Splits request text into its components.
    ///
    /// Fails on control characters, a missing scheme before `:`, or a port
    /// that is not all digits.
    pub fn split(text: &'a str) -> Result<Self, RequestError> {
        let bad = |why: &str| RequestError::BadUrl(format!("{why} in {text:?}"));

        if text.chars().any(|c| c.is_ascii_control()) {
            return Err(bad("control character"));
        }

        let text = text.split_once('#').map_or(text, |(before, _)| before);

        let (scheme, rest) = match text.split_once(':') {
            Some(("", _)) => return Err(bad("missing scheme")),
            Some((scheme, rest)) if is_scheme(scheme) => (Some(scheme), rest),
            _ => (None, text),
        };

        let (rest, query) = match rest.split_once('?') {
            Some((rest, query)) => (rest, Some(query)),
            None => (rest, None),
        };

        let (authority, path) = match rest.strip_prefix("//") {
            Some(after) => after.split_at(after.find('/').unwrap_or(after.len())),
            // `scheme:opaque` carries no host and no path.
            None if scheme.is_some() && !rest.starts_with('/') => ("", ""),
            None => ("", rest),
        };

        let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
        let (host, port) = split_host_port(host_port).ok_or_else(|| bad("invalid port"))?;

        Ok(Self {
            scheme,
            host,
            port,
            path,
            query,
        })
    }

    /// The host with IPv6 brackets removed.
    pub fn hostname(&self) -> &'a str {
        self.host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(self.host)
    }
}

impl Request {
    /// Parses a request line without checking it against configuration.
    pub fn parse(line: &str) -> Result<Self, RequestError> {
        let parts = UrlParts::split(line)?;

        // Syntax only; comparisons use the text as written.
        if !parts.host.is_empty() {
            Host::<String>::parse(parts.host)
                .map_err(|e| RequestError::BadUrl(format!("{e} in {line:?}")))?;
        }

        Ok(Self {
            url: line.to_string(),
            scheme: parts.scheme.map(str::to_ascii_lowercase),
            host: parts.hostname().to_string(),
            port: parts.port.map(String::from),
            path: decode_path(parts.path)?,
            query: parts.query.map(String::from),
        })
    }
}

/// Parses `line` and checks it is addressed to this server.
///
/// Checks run in a fixed order: empty host, port, host, scheme.
pub fn validate(line: &str, config: &Config) -> Result<Validated, RequestError> {
    let request = Request::parse(line)?;

    if request.host.is_empty() {
        return Err(RequestError::EmptyHost(line.to_string()));
    }

    if let Some(port) = &request.port {
        if *port != config.bind_port {
            return Err(RequestError::WrongPort(port.clone()));
        }
    }

    if request.host != config.hostname {
        return Err(RequestError::WrongHost(request.host));
    }

    if let Some(scheme) = &request.scheme {
        if scheme != SCHEME {
            return Err(RequestError::BadScheme(scheme.clone()));
        }
    }

    tracing::info!(url = %line, "Got a request");

    if request.path.is_empty() {
        return Ok(Validated::Redirect(format!("{line}/")));
    }

    Ok(Validated::Resolve(request))
}

/// Splits `host[:port]` or `[v6]:port`. `None` when the port has a
/// non-digit or text follows an IPv6 literal.
fn split_host_port(text: &str) -> Option<(&str, Option<&str>)> {
    let (host, port) = if text.starts_with('[') {
        let close = text.find(']')?;
        let (host, after) = text.split_at(close + 1);
        if after.is_empty() {
            (host, "")
        } else {
            (host, after.strip_prefix(':')?)
        }
    } else {
        text.rsplit_once(':').unwrap_or((text, ""))
    };

    if !port.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((host, (!port.is_empty()).then_some(port)))
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn decode_path(raw: &str) -> Result<String, RequestError> {
    let bytes = raw.as_bytes();
    for (i, _) in raw.match_indices('%') {
        let valid = bytes
            .get(i + 1..i + 3)
            .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
        if !valid {
            return Err(RequestError::BadUrl(format!("invalid escape in path {raw:?}")));
        }
    }

    percent_decode_str(raw)
        .decode_utf8()
        .map(Cow::into_owned)
        .map_err(|_| RequestError::BadUrl(format!("path {raw:?} is not UTF-8")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_of(text: &str) -> &str {
        UrlParts::split(text).unwrap().path
    }

    #[test]
    fn split_keeps_dot_segments() {
        assert_eq!(path_of("gemini://host/a/../b?x=1"), "/a/../b");
    }

    #[test]
    fn split_of_bare_authority_has_empty_path() {
        assert_eq!(path_of("gemini://host:1965"), "");
        assert_eq!(path_of("//host?q"), "");
    }

    #[test]
    fn host_port_is_literal() {
        assert_eq!(split_host_port("h:01965"), Some(("h", Some("01965"))));
        assert_eq!(split_host_port("h:"), Some(("h", None)));
        assert_eq!(split_host_port("[::1]:1965"), Some(("[::1]", Some("1965"))));
        assert_eq!(split_host_port("[::1]x"), None);
        assert_eq!(split_host_port("h:19a5"), None);
    }

    #[test]
    fn decodes_escapes() {
        assert_eq!(decode_path("/a%20b.gmi").unwrap(), "/a b.gmi");
        assert!(decode_path("/a%2").is_err());
        assert!(decode_path("/a%zz").is_err());
    }
}
