//! Transport-level queue addresses ("format names").

use crate::message::QueueName;
use crate::status::StatusCode;

const DIRECT_PREFIX: &str = "DIRECT=";

/// Addressing scheme of a direct format name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressScheme {
    /// Local or OS-resolved machine name
    Os,
    /// Numeric network address
    Tcp,
}

impl AddressScheme {
    /// Pick the scheme for a queue path.
    ///
    /// A path that starts with a digit is taken to name its machine by
    /// network address.
    pub fn for_path(path: &str) -> Self {
        match path.chars().next() {
            Some(c) if c.is_ascii_digit() => Self::Tcp,
            _ => Self::Os,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Os => "OS",
            Self::Tcp => "TCP",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("OS") {
            Some(Self::Os)
        } else if s.eq_ignore_ascii_case("TCP") {
            Some(Self::Tcp)
        } else {
            None
        }
    }
}

/// Direct format name such as `DIRECT=OS:.\private$\orders`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FormatName {
    scheme: AddressScheme,
    path: String,
}

impl FormatName {
    /// Derive the direct format name for a queue path
    pub fn for_path(path: &QueueName) -> Self {
        Self {
            scheme: AddressScheme::for_path(path.as_str()),
            path: path.as_str().to_string(),
        }
    }

    /// Parse a `DIRECT=<scheme>:<path>` string
    pub fn parse(address: &str) -> Result<Self, StatusCode> {
        let rest = strip_prefix_ignore_case(address, DIRECT_PREFIX)
            .ok_or(StatusCode::ILLEGAL_FORMATNAME)?;
        let (scheme, path) = rest.split_once(':').ok_or(StatusCode::ILLEGAL_FORMATNAME)?;
        let scheme = AddressScheme::parse(scheme).ok_or(StatusCode::ILLEGAL_FORMATNAME)?;
        if path.is_empty() {
            return Err(StatusCode::ILLEGAL_FORMATNAME);
        }

        Ok(Self {
            scheme,
            path: path.to_string(),
        })
    }

    pub fn scheme(&self) -> AddressScheme {
        self.scheme
    }

    /// Queue path the format name points at
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl std::fmt::Display for FormatName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}:{}", DIRECT_PREFIX, self.scheme.as_str(), self.path)
    }
}

/// Resolve an open address to the queue path it names.
///
/// Plain paths are returned as-is; strings that start with `DIRECT=` must be
/// well-formed direct format names.
pub fn queue_path_from_address(address: &str) -> Result<String, StatusCode> {
    if strip_prefix_ignore_case(address, DIRECT_PREFIX).is_some() {
        return FormatName::parse(address).map(|name| name.path);
    }

    if address.is_empty() {
        return Err(StatusCode::ILLEGAL_QUEUE_PATHNAME);
    }

    Ok(address.to_string())
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len()
        && s.is_char_boundary(prefix.len())
        && s[..prefix.len()].eq_ignore_ascii_case(prefix)
    {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

#[cfg(test)]
#[path = "address_tests.rs"]
mod tests;
