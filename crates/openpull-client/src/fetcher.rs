use std::net::IpAddr;
use std::time::Duration;

use openpull_core::error::ScrapeError;
use openpull_core::traits::Fetcher;
use reqwest::Client;
use url::{Host, Url};

const USER_AGENT: &str = "openpull/0.1 (LLM web extractor)";

/// HTTP fetcher using reqwest.
///
/// Downloads raw page bodies with a configurable timeout. This layer performs
/// no retries: a page that cannot be fetched is reported once and the
/// pipeline stops. SSRF protection is **enabled** by default, refusing
/// requests to private/reserved addresses before any connection is made. Use
/// [`allow_private_urls`](Self::allow_private_urls) to opt out when the
/// caller controls the machine.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout: Duration,
    ssrf_protection: bool,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, ScrapeError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, ScrapeError> {
        Self::build(USER_AGENT, timeout)
    }

    /// Replace the User-Agent header. Rebuilds the HTTP client.
    pub fn with_user_agent(self, user_agent: &str) -> Result<Self, ScrapeError> {
        let rebuilt = Self::build(user_agent, self.timeout)?;
        Ok(Self {
            ssrf_protection: self.ssrf_protection,
            ..rebuilt
        })
    }

    /// Allow requests to private/reserved addresses.
    pub fn allow_private_urls(mut self) -> Self {
        self.ssrf_protection = false;
        self
    }

    fn build(user_agent: &str, timeout: Duration) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| ScrapeError::Fetch {
                status: None,
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            timeout,
            ssrf_protection: true,
        })
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        let target = parse_target(url)?;
        if self.ssrf_protection {
            screen_target(&target).await?;
        }

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ScrapeError::Timeout(self.timeout.as_secs())
            } else if e.is_connect() {
                ScrapeError::Transient(format!("connection failed: {e}"))
            } else {
                ScrapeError::Fetch {
                    status: None,
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Fetch {
                status: Some(status.as_u16()),
                message: format!("HTTP {} for {}", status.as_u16(), url),
            });
        }

        response.text().await.map_err(|e| ScrapeError::Fetch {
            status: Some(status.as_u16()),
            message: format!("failed to read response body: {e}"),
        })
    }
}

// ---------------------------------------------------------------------------
// URL validation and SSRF screening
// ---------------------------------------------------------------------------

fn fetch_rejected(message: String) -> ScrapeError {
    ScrapeError::Fetch {
        status: None,
        message,
    }
}

/// Parse and structurally validate a target URL. Only absolute http/https
/// URLs with a host are accepted.
fn parse_target(url: &str) -> Result<Url, ScrapeError> {
    let parsed = Url::parse(url).map_err(|e| fetch_rejected(format!("invalid URL: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(fetch_rejected(format!(
                "URL scheme '{scheme}' is not allowed (only http/https)"
            )));
        }
    }

    if parsed.host().is_none() {
        return Err(fetch_rejected("URL has no host".to_string()));
    }

    Ok(parsed)
}

/// Refuse targets whose host is, or resolves to, a private/reserved address.
async fn screen_target(url: &Url) -> Result<(), ScrapeError> {
    let host = match url.host() {
        Some(host) => host,
        None => return Err(fetch_rejected("URL has no host".to_string())),
    };

    match host {
        Host::Ipv4(ip) => screen_ip(IpAddr::V4(ip), &ip.to_string()),
        Host::Ipv6(ip) => screen_ip(IpAddr::V6(ip), &ip.to_string()),
        Host::Domain(name) => {
            let port = url.port_or_known_default().unwrap_or(80);
            let resolved: Vec<_> = tokio::net::lookup_host((name, port))
                .await
                .map_err(|e| {
                    ScrapeError::Transient(format!("DNS resolution failed for {name}: {e}"))
                })?
                .collect();

            if resolved.is_empty() {
                return Err(ScrapeError::Transient(format!(
                    "DNS resolution returned no addresses for {name}"
                )));
            }
            for addr in resolved {
                screen_ip(addr.ip(), name)?;
            }
            Ok(())
        }
    }
}

fn screen_ip(ip: IpAddr, host: &str) -> Result<(), ScrapeError> {
    if is_reserved_ip(ip) {
        Err(fetch_rejected(format!(
            "refusing {host}: resolves to private/reserved address {ip}"
        )))
    } else {
        Ok(())
    }
}

/// True for loopback, private, link-local, CGN, documentation and other
/// non-routable ranges, including IPv4-mapped IPv6 forms of them.
fn is_reserved_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let octets = v4.octets();
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation()
                // 100.64.0.0/10, carrier-grade NAT
                || (octets[0] == 100 && (octets[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => {
            let segments = v6.segments();
            v6.is_loopback()
                || v6.is_unspecified()
                // fe80::/10 link-local
                || (segments[0] & 0xFFC0) == 0xFE80
                // fc00::/7 unique local
                || (segments[0] & 0xFE00) == 0xFC00
                || v6
                    .to_ipv4_mapped()
                    .is_some_and(|v4| is_reserved_ip(IpAddr::V4(v4)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_ipv4_ranges() {
        assert!(is_reserved_ip("127.0.0.1".parse().unwrap()));
        assert!(is_reserved_ip("10.1.2.3".parse().unwrap()));
        assert!(is_reserved_ip("172.16.0.1".parse().unwrap()));
        assert!(is_reserved_ip("192.168.1.1".parse().unwrap()));
        assert!(is_reserved_ip("169.254.169.254".parse().unwrap())); // cloud metadata
        assert!(is_reserved_ip("0.0.0.0".parse().unwrap()));
        assert!(is_reserved_ip("100.64.0.1".parse().unwrap())); // CGN
    }

    #[test]
    fn public_ipv4_passes() {
        assert!(!is_reserved_ip("8.8.8.8".parse().unwrap()));
        assert!(!is_reserved_ip("1.1.1.1".parse().unwrap()));
        assert!(!is_reserved_ip("93.184.216.34".parse().unwrap()));
    }

    #[test]
    fn reserved_ipv6_ranges() {
        assert!(is_reserved_ip("::1".parse().unwrap()));
        assert!(is_reserved_ip("::".parse().unwrap()));
        assert!(is_reserved_ip("fe80::1".parse().unwrap()));
        assert!(is_reserved_ip("fc00::1".parse().unwrap()));
        assert!(is_reserved_ip("::ffff:127.0.0.1".parse().unwrap()));
        assert!(is_reserved_ip("::ffff:169.254.169.254".parse().unwrap()));
    }

    #[test]
    fn public_ipv6_passes() {
        assert!(!is_reserved_ip("2001:4860:4860::8888".parse().unwrap()));
    }

    #[test]
    fn rejects_non_http_schemes() {
        let err = parse_target("file:///etc/passwd").unwrap_err();
        assert!(err.to_string().contains("not allowed"));

        let err = parse_target("ftp://example.com/file").unwrap_err();
        assert!(err.to_string().contains("not allowed"));
    }

    #[test]
    fn rejects_relative_and_malformed_urls() {
        assert!(parse_target("/just/a/path").is_err());
        assert!(parse_target("not a url").is_err());
        assert!(parse_target("").is_err());
    }

    #[test]
    fn accepts_http_and_https() {
        assert!(parse_target("http://example.com").is_ok());
        assert!(parse_target("https://example.com/page?q=1").is_ok());
    }

    #[tokio::test]
    async fn screens_ip_literal_targets() {
        let url = Url::parse("http://127.0.0.1/admin").unwrap();
        let err = screen_target(&url).await.unwrap_err();
        assert!(err.to_string().contains("private/reserved"));

        let url = Url::parse("http://169.254.169.254/latest/meta-data/").unwrap();
        assert!(screen_target(&url).await.is_err());
    }

    #[tokio::test]
    async fn screens_ipv6_literal_targets() {
        let url = Url::parse("http://[::1]:8080/").unwrap();
        assert!(screen_target(&url).await.is_err());
    }
}
