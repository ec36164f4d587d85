//! XACML-specific name datatypes: x500Name, rfc822Name, ipAddress, dnsName.
//!
//! Each type keeps its original lexical form and implements the equality and
//! match semantics its standard functions require:
//!
//! - x500Name: normalized RDN sequence; `x500Name-match` is a terminal
//!   (suffix) match on RDN sequences
//! - rfc822Name: case-sensitive local part, case-insensitive domain;
//!   `rfc822Name-match` accepts full address, `domain` and `.subdomain`
//!   pattern shapes
//! - ipAddress: v4/v6 address with optional mask and port range
//! - dnsName: hostname (optionally `*.`-prefixed) with optional port range

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

// =============================================================================
// X500Name
// =============================================================================

/// An X.500 distinguished name, e.g. `cn=John Doe, o=Example, c=US`.
///
/// The RDN sequence is normalized (lowercased attribute types, trimmed
/// values) for equality and match; the original string is kept for output.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct X500Name {
    /// RDNs in written order (most-specific first), each a list of
    /// `(attribute type, value)` pairs for multi-valued RDNs.
    rdns: Vec<Vec<(String, String)>>,
    original: String,
}

impl X500Name {
    /// Parses a distinguished name. Commas and plus signs may be escaped
    /// with a backslash.
    pub fn parse(s: &str) -> Result<Self, String> {
        if s.trim().is_empty() {
            return Err("empty x500Name".to_string());
        }
        let mut rdns = Vec::new();
        for rdn_str in split_unescaped(s, ',') {
            let mut rdn = Vec::new();
            for part in split_unescaped(&rdn_str, '+') {
                let (attr_type, value) = part
                    .split_once('=')
                    .ok_or_else(|| format!("invalid RDN (missing '='): {part}"))?;
                rdn.push((
                    attr_type.trim().to_ascii_lowercase(),
                    unescape(value.trim()).to_ascii_lowercase(),
                ));
            }
            if rdn.is_empty() {
                return Err(format!("invalid x500Name: {s}"));
            }
            rdn.sort();
            rdns.push(rdn);
        }
        Ok(Self {
            rdns,
            original: s.to_string(),
        })
    }

    /// The original lexical form.
    pub fn lexical(&self) -> &str {
        &self.original
    }

    /// `x500Name-match`: true iff `self` matches the terminal RDN sequence
    /// of `other` (i.e. `other` ends with `self`'s RDNs).
    pub fn matches_terminal_of(&self, other: &X500Name) -> bool {
        if self.rdns.len() > other.rdns.len() {
            return false;
        }
        let offset = other.rdns.len() - self.rdns.len();
        other.rdns[offset..] == self.rdns[..]
    }
}

impl PartialEq for X500Name {
    fn eq(&self, other: &Self) -> bool {
        self.rdns == other.rdns
    }
}

impl Eq for X500Name {}

impl fmt::Display for X500Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

/// Splits on `sep` outside backslash escapes.
fn split_unescaped(s: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for c in s.chars() {
        if escaped {
            current.push('\\');
            current.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == sep {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    if escaped {
        current.push('\\');
    }
    parts.push(current);
    parts
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;
    for c in s.chars() {
        if escaped {
            out.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else {
            out.push(c);
        }
    }
    out
}

// =============================================================================
// Rfc822Name
// =============================================================================

/// An RFC 822 mailbox name, `local-part@domain`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Rfc822Name {
    local: String,
    domain: String,
    original: String,
}

impl Rfc822Name {
    pub fn parse(s: &str) -> Result<Self, String> {
        let (local, domain) = s
            .split_once('@')
            .ok_or_else(|| format!("invalid rfc822Name (missing '@'): {s}"))?;
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(format!("invalid rfc822Name: {s}"));
        }
        Ok(Self {
            local: local.to_string(),
            domain: domain.to_ascii_lowercase(),
            original: s.to_string(),
        })
    }

    /// The original lexical form.
    pub fn lexical(&self) -> &str {
        &self.original
    }

    /// `rfc822Name-match` against the three XACML pattern shapes:
    ///
    /// - `local@domain`: whole name, local part case-sensitive, domain not
    /// - `domain`: any mailbox in exactly that domain
    /// - `.subdomain`: any mailbox in a host below that domain suffix
    pub fn matches_pattern(&self, pattern: &str) -> bool {
        if let Some((local, domain)) = pattern.split_once('@') {
            return self.local == local && self.domain == domain.to_ascii_lowercase();
        }
        if let Some(suffix) = pattern.strip_prefix('.') {
            let suffix = suffix.to_ascii_lowercase();
            return self.domain.ends_with(&suffix)
                && self.domain.len() > suffix.len()
                && self.domain.as_bytes()[self.domain.len() - suffix.len() - 1] == b'.';
        }
        self.domain == pattern.to_ascii_lowercase()
    }
}

impl PartialEq for Rfc822Name {
    fn eq(&self, other: &Self) -> bool {
        self.local == other.local && self.domain == other.domain
    }
}

impl Eq for Rfc822Name {}

impl fmt::Display for Rfc822Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

// =============================================================================
// PortRange
// =============================================================================

/// A port or port range suffix: `80`, `80-443`, `-443`, `1024-`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    pub low: Option<u16>,
    pub high: Option<u16>,
}

impl PortRange {
    /// The unbounded range (no port component present).
    pub fn any() -> Self {
        Self::default()
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        let err = || format!("invalid port range: {s}");
        if s.is_empty() {
            return Err(err());
        }
        if let Some((lo, hi)) = s.split_once('-') {
            let low = if lo.is_empty() {
                None
            } else {
                Some(lo.parse().map_err(|_| err())?)
            };
            let high = if hi.is_empty() {
                None
            } else {
                Some(hi.parse().map_err(|_| err())?)
            };
            if low.is_none() && high.is_none() {
                return Err(err());
            }
            Ok(Self { low, high })
        } else {
            let port: u16 = s.parse().map_err(|_| err())?;
            Ok(Self {
                low: Some(port),
                high: Some(port),
            })
        }
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.low, self.high) {
            (None, None) => Ok(()),
            (Some(lo), Some(hi)) if lo == hi => write!(f, "{lo}"),
            (lo, hi) => {
                if let Some(lo) = lo {
                    write!(f, "{lo}")?;
                }
                write!(f, "-")?;
                if let Some(hi) = hi {
                    write!(f, "{hi}")?;
                }
                Ok(())
            }
        }
    }
}

// =============================================================================
// IpAddress
// =============================================================================

/// An XACML ipAddress: address, optional mask, optional port range.
///
/// Lexical forms: `10.0.0.1`, `10.0.0.1/255.0.0.0`, `10.0.0.1:80-443`,
/// `[::1]`, `[::1]/[ffff::]`, `[::1]:8080`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpAddress {
    pub address: IpAddr,
    pub mask: Option<IpAddr>,
    pub port_range: PortRange,
}

impl IpAddress {
    pub fn parse(s: &str) -> Result<Self, String> {
        let err = || format!("invalid ipAddress: {s}");

        // IPv6 literals are bracketed; the port separator ':' is ambiguous
        // otherwise.
        if let Some(rest) = s.strip_prefix('[') {
            let (addr_str, rest) = rest.split_once(']').ok_or_else(err)?;
            let address: IpAddr = addr_str.parse().map_err(|_| err())?;
            let (mask, rest) = if let Some(mask_rest) = rest.strip_prefix("/[") {
                let (mask_str, rest) = mask_rest.split_once(']').ok_or_else(err)?;
                (Some(mask_str.parse().map_err(|_| err())?), rest)
            } else {
                (None, rest)
            };
            let port_range = match rest.strip_prefix(':') {
                Some(ports) => PortRange::parse(ports).map_err(|_| err())?,
                None if rest.is_empty() => PortRange::any(),
                None => return Err(err()),
            };
            if !address.is_ipv6() || mask.is_some_and(|m: IpAddr| !m.is_ipv6()) {
                return Err(err());
            }
            return Ok(Self {
                address,
                mask,
                port_range,
            });
        }

        let (addr_part, port_range) = match s.split_once(':') {
            Some((a, p)) => (a, PortRange::parse(p).map_err(|_| err())?),
            None => (s, PortRange::any()),
        };
        let (addr_str, mask) = match addr_part.split_once('/') {
            Some((a, m)) => (a, Some(m.parse().map_err(|_| err())?)),
            None => (addr_part, None),
        };
        let address: IpAddr = addr_str.parse().map_err(|_| err())?;
        if !address.is_ipv4() || mask.is_some_and(|m: IpAddr| !m.is_ipv4()) {
            return Err(err());
        }
        Ok(Self {
            address,
            mask,
            port_range,
        })
    }

    /// Canonical lexical form (reconstructed, not the input string).
    pub fn lexical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for IpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.address.is_ipv6() {
            write!(f, "[{}]", self.address)?;
            if let Some(mask) = &self.mask {
                write!(f, "/[{mask}]")?;
            }
        } else {
            write!(f, "{}", self.address)?;
            if let Some(mask) = &self.mask {
                write!(f, "/{mask}")?;
            }
        }
        if self.port_range != PortRange::any() {
            write!(f, ":{}", self.port_range)?;
        }
        Ok(())
    }
}

// =============================================================================
// DnsName
// =============================================================================

/// An XACML dnsName: hostname (optionally a `*.` wildcard prefix) with an
/// optional port range, e.g. `example.com`, `*.example.com:8080-8088`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DnsName {
    hostname: String,
    pub port_range: PortRange,
    original: String,
}

impl DnsName {
    pub fn parse(s: &str) -> Result<Self, String> {
        let err = || format!("invalid dnsName: {s}");
        let (host, port_range) = match s.split_once(':') {
            Some((h, p)) => (h, PortRange::parse(p).map_err(|_| err())?),
            None => (s, PortRange::any()),
        };
        let bare = host.strip_prefix("*.").unwrap_or(host);
        if bare.is_empty()
            || !bare
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        {
            return Err(err());
        }
        Ok(Self {
            hostname: host.to_ascii_lowercase(),
            port_range,
            original: s.to_string(),
        })
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// The original lexical form.
    pub fn lexical(&self) -> &str {
        &self.original
    }
}

impl PartialEq for DnsName {
    fn eq(&self, other: &Self) -> bool {
        self.hostname == other.hostname && self.port_range == other.port_range
    }
}

impl Eq for DnsName {}

impl fmt::Display for DnsName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}
