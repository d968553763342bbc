use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

lazy_static! {
    static ref WEBSTORE: Regex = Regex::new(r"^https?://chrome\.google\.com/webstore").unwrap();
    static ref GOOGLE_DOCS: Regex = Regex::new(r"docs\.google\.com").unwrap();
    static ref NON_WEB_PAGE: Regex = Regex::new(
        r"^(file:|chrome:|about:|moz-extension:|chrome-extension:|view-source:|https?://addons\.mozilla\.org)"
    )
    .unwrap();
    // replacing text breaks these editors
    static ref NO_REPLACEMENT_SITES: Regex =
        Regex::new(r"^https?://(www\.)?(facebook|medium)\.com.*").unwrap();
}

/// Pages that are never checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SiteExclusion {
    Webstore,
    GoogleDocs,
    Unsupported,
}

impl SiteExclusion {
    pub fn for_url(url: &str) -> Option<Self> {
        if WEBSTORE.is_match(url) {
            Some(Self::Webstore)
        } else if GOOGLE_DOCS.is_match(url) {
            Some(Self::GoogleDocs)
        } else if NON_WEB_PAGE.is_match(url) {
            Some(Self::Unsupported)
        } else {
            None
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Webstore => "Checking is not supported on the extension store.",
            Self::GoogleDocs => "Google Docs is not supported, please use the dedicated add-on.",
            Self::Unsupported => "Checking is not supported on this page.",
        }
    }

    /// Page URL with local paths removed, safe to log.
    pub fn loggable_url(url: &str) -> String {
        match url.find("file:") {
            Some(pos) => format!("{}file:[...]", &url[..pos]),
            None => url.to_string(),
        }
    }
}

/// Whether one-click replacement works on this page at all.
pub fn replacement_supported(url: &str) -> bool {
    !NO_REPLACEMENT_SITES.is_match(url)
}
