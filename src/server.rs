use crate::settings::Settings;
use lazy_static::lazy_static;
use regex::Regex;

pub const DEFAULT_SERVER_URL: &str = "https://api.languagetool.org/v2";
pub const OLD_DEFAULT_SERVER_URL: &str = "https://languagetool.org/api/v2";
pub const PREMIUM_SERVER_URL: &str = "https://languagetoolplus.com/api/v2";

lazy_static! {
    // "http://localhost", "http://localhost.foo" etc. are fine too
    static ref HTTP_URL: Regex = Regex::new(r"^https?://.+$").unwrap();
}

/// Pick the checking server for this session.
pub fn resolve_server_url(settings: &Settings) -> String {
    if settings.have_premium_account {
        PREMIUM_SERVER_URL.to_string()
    } else {
        settings.api_server_url.clone()
    }
}

/// The public server, including its previous address.
pub fn is_default_server(url: &str) -> bool {
    url == DEFAULT_SERVER_URL || url == OLD_DEFAULT_SERVER_URL
}

pub fn validate_server_url(input: &str) -> bool {
    HTTP_URL.is_match(input)
}

pub fn portal_url(server_url: &str) -> String {
    format!("{server_url}/portal/")
}

pub fn login_url(server_url: &str) -> String {
    format!("{server_url}/login/?plugin=true")
}

/// Who checked the text, for the footer of the result list.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub enum Attribution {
    CheckedRemotely,
    CheckedBy(String),
}

pub fn attribution(server_url: &str) -> Attribution {
    if is_default_server(server_url) {
        Attribution::CheckedRemotely
    } else {
        Attribution::CheckedBy(server_url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_premium_overrides_configured_server() {
        let settings = Settings {
            api_server_url: "https://lt.example.org/v2".to_string(),
            have_premium_account: true,
            ..Settings::default()
        };
        assert_eq!(resolve_server_url(&settings), PREMIUM_SERVER_URL);

        let settings = Settings {
            have_premium_account: false,
            ..settings
        };
        assert_eq!(resolve_server_url(&settings), "https://lt.example.org/v2");
    }

    #[test]
    fn test_validate_server_url() {
        assert!(validate_server_url("http://localhost"));
        assert!(validate_server_url("https://lt.example.org:8081/v2"));
        assert!(!validate_server_url("ftp://example.org"));
        assert!(!validate_server_url("example.org"));
        assert!(!validate_server_url("https://"));
    }

    #[test]
    fn test_attribution() {
        assert_eq!(
            attribution(OLD_DEFAULT_SERVER_URL),
            Attribution::CheckedRemotely
        );
        assert_eq!(
            attribution("http://localhost:8081/v2"),
            Attribution::CheckedBy("http://localhost:8081/v2".to_string())
        );
    }

    #[test]
    fn test_links() {
        assert_eq!(
            login_url(DEFAULT_SERVER_URL),
            "https://api.languagetool.org/v2/login/?plugin=true"
        );
        assert_eq!(
            portal_url(DEFAULT_SERVER_URL),
            "https://api.languagetool.org/v2/portal/"
        );
    }
}
