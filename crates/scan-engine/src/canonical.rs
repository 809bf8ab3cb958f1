//! URL canonicalization and fingerprinting.

use sha2::{Digest, Sha256};
use url::Url;

use crate::error::{Result, ScanError};

const MAX_URL_BYTES: usize = 2048;

/// The normalized form of a scanned URL, used for hashing, caching and
/// cross-component matching. Two requests that differ only in query
/// parameter order or default port end up with the same fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CanonicalUrl {
    pub scheme: String,
    pub host: String,
    /// Explicit port, only when it differs from the scheme's default (80 for
    /// `http`, 443 for `https`). `host` stays the bare hostname so DNS/TLS
    /// collectors and domain analyzers never have to strip it back off.
    pub port: Option<u16>,
    pub registrable_domain: String,
    pub tld: String,
    pub path_normalized: String,
    pub query_sorted: String,
    pub fingerprint_hash: String,
}

impl CanonicalUrl {
    pub fn as_url_string(&self) -> String {
        let mut s = format!("{}://{}", self.scheme, self.host);
        if let Some(port) = self.port {
            s.push(':');
            s.push_str(&port.to_string());
        }
        s.push_str(&self.path_normalized);
        if !self.query_sorted.is_empty() {
            s.push('?');
            s.push_str(&self.query_sorted);
        }
        s
    }
}

fn default_port(scheme: &str) -> u16 {
    if scheme == "https" {
        443
    } else {
        80
    }
}

/// Parse and normalize a raw URL. Only `http`/`https` are accepted.
pub fn canonicalize(raw: &str) -> Result<CanonicalUrl> {
    if raw.len() > MAX_URL_BYTES {
        return Err(ScanError::UrlTooLong(raw.len()));
    }

    let url = Url::parse(raw).map_err(|e| ScanError::MalformedUrl(e.to_string()))?;

    let scheme = url.scheme().to_ascii_lowercase();
    if scheme != "http" && scheme != "https" {
        return Err(ScanError::UnsupportedScheme(scheme));
    }

    let host_raw = url
        .host_str()
        .ok_or_else(|| ScanError::MalformedUrl("missing host".to_string()))?;
    let host = idna::domain_to_ascii(host_raw)
        .map_err(|_| ScanError::MalformedUrl(format!("invalid idna host: {host_raw}")))?
        .to_ascii_lowercase();

    let port = url.port().filter(|p| *p != default_port(&scheme));

    let (registrable_domain, tld) = registrable_domain_and_tld(&host);

    let path_normalized = normalize_path(url.path());
    let query_sorted = normalize_query(url.query());

    let host_with_port = match port {
        Some(p) => format!("{host}:{p}"),
        None => host.clone(),
    };
    let canonical_bytes = format!(
        "{scheme}://{host_with_port}{path_normalized}{}{query_sorted}",
        if query_sorted.is_empty() { "" } else { "?" }
    )
    .to_ascii_lowercase();

    let mut hasher = Sha256::new();
    hasher.update(canonical_bytes.as_bytes());
    let fingerprint_hash = hex::encode(hasher.finalize());

    Ok(CanonicalUrl {
        scheme,
        host,
        port,
        registrable_domain,
        tld,
        path_normalized,
        query_sorted,
        fingerprint_hash,
    })
}

/// Derive the registrable domain (eTLD+1) and the public suffix for a host,
/// falling back to the bare host when the Public Suffix List has no entry
/// (e.g. raw IP literals).
fn registrable_domain_and_tld(host: &str) -> (String, String) {
    let list = psl::List;
    match psl::Psl::domain(&list, host.as_bytes()) {
        Some(domain) => {
            let registrable = String::from_utf8_lossy(domain.as_bytes()).to_string();
            let suffix = String::from_utf8_lossy(domain.suffix().as_bytes()).to_string();
            (registrable, suffix)
        }
        None => (host.to_string(), String::new()),
    }
}

/// Percent-decodes unreserved octets (`%41` -> `A`) and re-encodes anything
/// else with uppercase hex, so two paths differing only in which safe
/// characters got escaped land on the same fingerprint. Segment structure
/// (`.`/`..`, duplicate slashes) is left untouched.
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let bytes = path.as_bytes();
    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(hex) = std::str::from_utf8(&bytes[i + 1..i + 3]) {
                if let Ok(decoded) = u8::from_str_radix(hex, 16) {
                    if is_unreserved(decoded) {
                        out.push(decoded as char);
                    } else {
                        out.push('%');
                        out.push_str(&hex.to_ascii_uppercase());
                    }
                    i += 3;
                    continue;
                }
            }
        }
        out.push(bytes[i] as char);
        i += 1;
    }
    out
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
}

fn normalize_query(query: Option<&str>) -> String {
    let Some(q) = query else {
        return String::new();
    };
    if q.is_empty() {
        return String::new();
    }
    let mut pairs: Vec<&str> = q.split('&').filter(|p| !p.is_empty()).collect();
    pairs.sort_unstable();
    pairs.join("&")
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        use std::fmt::Write;
        let mut s = String::with_capacity(bytes.as_ref().len() * 2);
        for b in bytes.as_ref() {
            let _ = write!(s, "{b:02x}");
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_scheme() {
        let err = canonicalize("ftp://example.com/").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidInput);
    }

    #[test]
    fn rejects_malformed_url() {
        assert!(canonicalize("not a url").is_err());
    }

    #[test]
    fn lowercases_host() {
        let c = canonicalize("http://ExAmple.COM/Path").unwrap();
        assert_eq!(c.host, "example.com");
    }

    #[test]
    fn sorts_query_params() {
        let a = canonicalize("http://example.com/?b=2&a=1").unwrap();
        let b = canonicalize("http://example.com/?a=1&b=2").unwrap();
        assert_eq!(a.fingerprint_hash, b.fingerprint_hash);
    }

    #[test]
    fn drops_fragment_from_fingerprint() {
        let a = canonicalize("http://example.com/path#section").unwrap();
        let b = canonicalize("http://example.com/path").unwrap();
        assert_eq!(a.fingerprint_hash, b.fingerprint_hash);
    }

    #[test]
    fn canonicalize_is_idempotent() {
        let a = canonicalize("http://Example.com/a?z=1&y=2").unwrap();
        let b = canonicalize(&a.as_url_string()).unwrap();
        assert_eq!(a.fingerprint_hash, b.fingerprint_hash);
    }

    #[test]
    fn registrable_domain_extraction() {
        let c = canonicalize("http://sub.example.co.uk/").unwrap();
        assert_eq!(c.registrable_domain, "example.co.uk");
        assert_eq!(c.tld, "co.uk");
    }

    #[test]
    fn drops_default_port() {
        let c = canonicalize("https://example.com:443/").unwrap();
        assert_eq!(c.port, None);
        assert_eq!(c.as_url_string(), "https://example.com/");
    }

    #[test]
    fn preserves_non_default_port() {
        let c = canonicalize("https://example.com:8443/").unwrap();
        assert_eq!(c.port, Some(8443));
        assert!(c.as_url_string().contains(":8443"));
    }

    #[test]
    fn percent_decoded_and_literal_paths_share_fingerprint() {
        let a = canonicalize("http://example.com/%41bc").unwrap();
        let b = canonicalize("http://example.com/Abc").unwrap();
        assert_eq!(a.fingerprint_hash, b.fingerprint_hash);
    }

    #[test]
    fn rejects_oversized_url() {
        let long = format!("http://example.com/{}", "a".repeat(3000));
        let err = canonicalize(&long).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidInput);
    }
}
