//! Join links
//!
//! The host advertises `<base>?mode=controller&id=<session id>`; whoever opens
//! that link becomes the controller. The session id is opaque here and only
//! interpreted by the transport.

use url::Url;

/// Which side of the session a process plays
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerRole {
    Host,
    Controller { host_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingError {
    /// Not parseable as a URL
    InvalidLink(String, url::ParseError),
    /// `mode=controller` without an `id`
    MissingHostId,
    EmptyHostId,
}

impl std::fmt::Display for PairingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PairingError::InvalidLink(link, e) => write!(f, "invalid link {link:?}: {e}"),
            PairingError::MissingHostId => write!(f, "controller link has no id parameter"),
            PairingError::EmptyHostId => write!(f, "controller link has an empty id"),
        }
    }
}

impl std::error::Error for PairingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PairingError::InvalidLink(_, e) => Some(e),
            _ => None,
        }
    }
}

fn parse_link(link: &str) -> Result<Url, PairingError> {
    Url::parse(link).map_err(|e| PairingError::InvalidLink(link.to_string(), e))
}

/// Build the link a controller opens to join `session_id`
///
/// Any query or fragment already on `base` is replaced.
pub fn join_link(base: &str, session_id: &str) -> Result<String, PairingError> {
    let mut url = parse_link(base)?;
    url.set_fragment(None);
    url.set_query(None);
    url.query_pairs_mut()
        .append_pair("mode", "controller")
        .append_pair("id", session_id);
    Ok(url.to_string())
}

/// Decide the role from a link's query string
///
/// A link without `mode=controller` is a host link. Input without a scheme
/// is taken as a bare host id (`host:port`).
pub fn role_from_link(link: &str) -> Result<PeerRole, PairingError> {
    let link = link.trim();
    if link.is_empty() {
        return Ok(PeerRole::Host);
    }
    if !link.contains("://") {
        if link.contains(['/', '?', '&']) {
            // Looks like a link, so let the parser say what is wrong
            parse_link(link)?;
        }
        return Ok(PeerRole::Controller {
            host_id: link.to_string(),
        });
    }

    let url = parse_link(link)?;
    let mut mode = None;
    let mut id = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "mode" => mode = Some(value.into_owned()),
            "id" => id = Some(value.into_owned()),
            _ => {}
        }
    }

    if mode.as_deref() != Some("controller") {
        return Ok(PeerRole::Host);
    }
    match id {
        None => Err(PairingError::MissingHostId),
        Some(id) if id.trim().is_empty() => Err(PairingError::EmptyHostId),
        Some(id) => Ok(PeerRole::Controller { host_id: id }),
    }
}
