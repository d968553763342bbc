use crate::reconcile::ReconciledMatchSet;
use crate::site_support::SiteExclusion;
use serde::Serialize;

// Markers in the service's human-readable error text. There are no
// structured error codes to match on, so these must stay byte-exact.
const TEXT_SIZE_MARKER: &str = "text exceeds the limit of";
const REQUEST_SIZE_MARKER: &str = "Request size limit of";
const LOGIN_FAILED_MARKER: &str = "code: 403";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SizeLimitKind {
    PerRequest,
    PerText,
}

/// Failures a check can end in, before they become an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    AuthRequired,
    LoginFailed(String),
    SizeLimitExceeded(SizeLimitKind, String),
    GenericError(String),
}

/// Classify a failed call by HTTP status and error text.
///
/// Returns `None` when neither carries an error. Status 401 wins over any
/// message. Nothing here retries.
pub fn classify_failure(status: Option<u16>, message: Option<&str>) -> Option<FailureKind> {
    if status == Some(401) {
        return Some(FailureKind::AuthRequired);
    }
    let message = message.map(str::trim).filter(|m| !m.is_empty());
    match (status, message) {
        (_, Some(m)) if m.contains(LOGIN_FAILED_MARKER) => {
            Some(FailureKind::LoginFailed(m.to_string()))
        }
        (_, Some(m)) if m.contains(TEXT_SIZE_MARKER) => Some(FailureKind::SizeLimitExceeded(
            SizeLimitKind::PerText,
            m.to_string(),
        )),
        (_, Some(m)) if m.contains(REQUEST_SIZE_MARKER) => Some(FailureKind::SizeLimitExceeded(
            SizeLimitKind::PerRequest,
            m.to_string(),
        )),
        (_, Some(m)) => Some(FailureKind::GenericError(m.to_string())),
        (Some(code), None) if !(200..300).contains(&code) => {
            Some(FailureKind::GenericError(format!("HTTP {code}")))
        }
        _ => None,
    }
}

/// What the rendering side is handed after a check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CheckOutcome {
    Matches(ReconciledMatchSet),
    Empty,
    AuthRequired,
    LoginFailed {
        message: String,
    },
    SizeLimitExceeded {
        limit: SizeLimitKind,
        message: String,
    },
    /// `exclusion` is set when the page was skipped by policy; it is
    /// shown like any other error but logged separately.
    GenericError {
        message: String,
        exclusion: Option<SiteExclusion>,
    },
    NoResponse,
    /// The consent prompt was declined; nothing was sent.
    Cancelled,
}

/// Follow-up offered next to a failed check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Affordance {
    Login,
    OpenSettings,
    ReloadPage,
}

impl From<FailureKind> for CheckOutcome {
    fn from(kind: FailureKind) -> Self {
        match kind {
            FailureKind::AuthRequired => Self::AuthRequired,
            FailureKind::LoginFailed(message) => Self::LoginFailed { message },
            FailureKind::SizeLimitExceeded(limit, message) => {
                Self::SizeLimitExceeded { limit, message }
            }
            FailureKind::GenericError(message) => Self::GenericError {
                message,
                exclusion: None,
            },
        }
    }
}

impl CheckOutcome {
    pub fn excluded(exclusion: SiteExclusion) -> Self {
        Self::GenericError {
            message: exclusion.message().to_string(),
            exclusion: Some(exclusion),
        }
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Matches(_) | Self::Empty | Self::Cancelled)
    }

    pub fn affordance(&self) -> Option<Affordance> {
        match self {
            Self::AuthRequired | Self::LoginFailed { .. } => Some(Affordance::Login),
            Self::SizeLimitExceeded { .. } => Some(Affordance::OpenSettings),
            Self::GenericError { exclusion: None, .. } => Some(Affordance::OpenSettings),
            Self::NoResponse => Some(Affordance::ReloadPage),
            _ => None,
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Matches(_) => "matches",
            Self::Empty => "empty",
            Self::AuthRequired => "auth_required",
            Self::LoginFailed { .. } => "login_failed",
            Self::SizeLimitExceeded { .. } => "size_limit_exceeded",
            Self::GenericError {
                exclusion: Some(_), ..
            } => "site_not_supported",
            Self::GenericError { .. } => "generic_error",
            Self::NoResponse => "no_response",
            Self::Cancelled => "cancelled",
        }
    }
}
