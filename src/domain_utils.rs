use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

lazy_static! {
    static ref DOMAIN_LINE: Regex = Regex::new(
        r"^(https?://)?[a-z0-9]+([-.][a-z0-9]+)*\.[a-z]{2,5}(:[0-9]{1,5})?(/.*)?$"
    )
    .unwrap();
    static ref IPV4: Regex = Regex::new(
        r"^(?:25[0-5]|2[0-4][0-9]|1[0-9][0-9]|[1-9][0-9]|[0-9])(?:\.(?:25[0-5]|2[0-4][0-9]|1[0-9][0-9]|[1-9][0-9]|[0-9])){3}$"
    )
    .unwrap();
}

/// Hostname helpers for the per-domain lists
pub struct DomainUtils;

impl DomainUtils {
    /// Hostname of a page URL, if it parses and has one
    pub fn hostname(url: &str) -> Option<String> {
        Url::parse(url)
            .ok()?
            .host_str()
            .filter(|h| !h.is_empty())
            .map(|h| h.to_string())
    }

    /// Hostname of the input, or the input itself when it is not a URL
    pub fn domain_name(input: &str) -> String {
        Self::hostname(input).unwrap_or_else(|| input.to_string())
    }

    /// Accepts URLs and bare hostnames, plus `localhost` and IPv4 addresses
    pub fn is_valid_domain_entry(input: &str) -> bool {
        DOMAIN_LINE.is_match(input) || input == "localhost" || IPV4.is_match(input)
    }

    /// Parse one-entry-per-line text into a normalized, deduplicated list
    pub fn parse_domain_lines(text: &str) -> Vec<String> {
        let mut domains: Vec<String> = Vec::new();
        for line in text.split('\n') {
            let line = line.trim_end_matches('\r');
            if line.is_empty() || !Self::is_valid_domain_entry(line) {
                continue;
            }
            let domain = Self::domain_name(line);
            if !domains.contains(&domain) {
                domains.push(domain);
            }
        }
        domains
    }

    /// Case-insensitive order, original case kept
    pub fn sorted_for_display(domains: &[String]) -> Vec<String> {
        let mut sorted = domains.to_vec();
        sorted.sort_by_key(|d| d.to_lowercase());
        sorted
    }

    /// Exact membership; only display sorting ignores case.
    pub fn contains(domains: &[String], hostname: &str) -> bool {
        domains.iter().any(|d| d == hostname)
    }
}
