//! Outbound URL allow-listing (§4.5 "all outbound URLs are validated against
//! an allow-list to prevent SSRF").
//!
//! Every provisioner and the `http`/`git` step executors route their
//! destination URL through `UrlAllowList::check` before dialing out. The
//! list is host-suffix based (`"gitea.internal"` matches
//! `gitea.internal:3000` but not `evil-gitea.internal`), loopback and
//! link-local literals are rejected outright regardless of the list.

use std::net::IpAddr;

use orch_core::OrchError;
use url::Url;

#[derive(Debug, Clone, Default)]
pub struct UrlAllowList {
    allowed_hosts: Vec<String>,
}

impl UrlAllowList {
    pub fn new(allowed_hosts: Vec<String>) -> Self {
        Self { allowed_hosts }
    }

    pub fn check(&self, raw_url: &str) -> Result<Url, OrchError> {
        let url = Url::parse(raw_url).map_err(|e| OrchError::Validation(format!("invalid URL '{raw_url}': {e}")))?;

        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(OrchError::Validation(format!("scheme '{}' is not permitted for outbound calls", url.scheme())));
        }

        let host = url.host_str()
                      .ok_or_else(|| OrchError::Validation(format!("URL '{raw_url}' has no host")))?;

        if let Ok(ip) = host.parse::<IpAddr>() {
            if is_disallowed_ip(&ip) {
                return Err(OrchError::Validation(format!("host '{host}' resolves to a disallowed address range")));
            }
        } else if host == "localhost" {
            return Err(OrchError::Validation("host 'localhost' is not permitted for outbound calls".into()));
        }

        if self.allowed_hosts.iter().any(|allowed| host_matches(host, allowed)) {
            Ok(url)
        } else {
            Err(OrchError::Validation(format!("host '{host}' is not on the outbound allow-list")))
        }
    }
}

fn host_matches(host: &str, allowed: &str) -> bool {
    host == allowed || host.ends_with(&format!(".{allowed}"))
}

fn is_disallowed_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_link_local() || v4.is_unspecified() || v4.is_private(),
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_an_exact_or_subdomain_match() {
        let list = UrlAllowList::new(vec!["gitea.internal".into()]);
        assert!(list.check("https://gitea.internal/api/v1/repos").is_ok());
        assert!(list.check("https://ci.gitea.internal/webhook").is_ok());
    }

    #[test]
    fn rejects_a_lookalike_host() {
        let list = UrlAllowList::new(vec!["gitea.internal".into()]);
        let err = list.check("https://evil-gitea.internal/api").unwrap_err();
        assert!(matches!(err, OrchError::Validation(_)));
    }

    #[test]
    fn rejects_loopback_and_private_literals_even_if_listed() {
        let list = UrlAllowList::new(vec!["127.0.0.1".into(), "10.0.0.5".into()]);
        assert!(list.check("http://127.0.0.1/admin").is_err());
        assert!(list.check("http://10.0.0.5/admin").is_err());
    }

    #[test]
    fn rejects_non_http_schemes() {
        let list = UrlAllowList::new(vec!["gitea.internal".into()]);
        let err = list.check("file:///etc/passwd").unwrap_err();
        assert!(matches!(err, OrchError::Validation(_)));
    }
}
