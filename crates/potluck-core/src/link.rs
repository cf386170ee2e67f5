//! Shareable event links.
//!
//! A link routes through the URL fragment so a static host can serve the
//! app without server-side routes:
//!
//! ```text
//! https://potluck.example#/event/K7Q2M9XA?data=eyJhIjoi…
//! ```

use std::fmt;

use url::Url;

use crate::error::LinkError;

const EVENT_ROUTE: &str = "/event/";

/// An event code plus, optionally, the snapshot token that travels with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    /// Scheme, host and optional base path, without a trailing slash.
    pub origin: String,
    pub event_code: String,
    pub token: Option<String>,
}

impl ShareLink {
    /// Build a link, validating `origin`.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::InvalidUrl`] if `origin` is not an absolute URL.
    pub fn new(
        origin: &str,
        event_code: impl Into<String>,
        token: Option<String>,
    ) -> Result<Self, LinkError> {
        Ok(Self {
            origin: normalize_origin(origin)?,
            event_code: event_code.into(),
            token,
        })
    }

    /// Recover code and token from a rendered link.
    ///
    /// Fragment routes (`#/event/<code>?data=<token>`) are preferred; plain
    /// path routes (`/event/<code>?data=<token>`) are accepted too.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::InvalidUrl`] for unparsable input and
    /// [`LinkError::MissingEventCode`] if no event route is present.
    pub fn parse(input: &str) -> Result<Self, LinkError> {
        let url = Url::parse(input.trim()).map_err(|err| LinkError::InvalidUrl(err.to_string()))?;

        if let Some(fragment) = url.fragment()
            && let Some((code, token)) = split_route(fragment)
        {
            let mut base = url.clone();
            base.set_fragment(None);
            base.set_query(None);
            return Ok(Self {
                origin: base.as_str().trim_end_matches('/').to_string(),
                event_code: code,
                token,
            });
        }

        let route = match url.query() {
            Some(query) => format!("{}?{query}", url.path()),
            None => url.path().to_string(),
        };
        let (code, token) = split_route(&route).ok_or(LinkError::MissingEventCode)?;
        if !url.origin().is_tuple() {
            return Err(LinkError::InvalidUrl(format!("{input} has no origin")));
        }
        let origin = url.origin().ascii_serialization();
        Ok(Self {
            origin,
            event_code: code,
            token,
        })
    }

    /// The fragment route, `#/event/<code>[?data=<token>]`.
    #[must_use]
    pub fn route(&self) -> String {
        match &self.token {
            Some(token) => format!("#{EVENT_ROUTE}{}?data={token}", self.event_code),
            None => format!("#{EVENT_ROUTE}{}", self.event_code),
        }
    }
}

impl fmt::Display for ShareLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.origin, self.route())
    }
}

fn normalize_origin(origin: &str) -> Result<String, LinkError> {
    let mut url =
        Url::parse(origin.trim()).map_err(|err| LinkError::InvalidUrl(err.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(LinkError::InvalidUrl(format!("{origin} is not a base url")));
    }
    url.set_fragment(None);
    url.set_query(None);
    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Split `/event/<code>?data=<token>` into its parts.
fn split_route(route: &str) -> Option<(String, Option<String>)> {
    let (path, query) = match route.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (route, None),
    };
    let code = event_code_from_path(path)?;
    let token = query.and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .find(|(key, _)| key == "data")
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
    });
    Some((code.to_string(), token))
}

/// Event code from a route path such as `/event/K7Q2M9XA`.
#[must_use]
pub fn event_code_from_path(path: &str) -> Option<&str> {
    let start = path.find(EVENT_ROUTE)? + EVENT_ROUTE.len();
    path[start..]
        .split('/')
        .rfind(|segment| !segment.is_empty())
}
