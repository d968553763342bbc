use crate::domain_utils::DomainUtils;
use crate::settings::Settings;
use serde::Serialize;

/// What the per-domain lists say about one hostname.
///
/// `disabled` wins over `auto_check` for display: a disabled page only
/// offers re-activation, even when it is also on the auto-check list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DomainPolicy {
    pub disabled: bool,
    pub auto_check: bool,
    /// On the ignore-check-on list: the global auto-check flag does not
    /// apply here.
    pub auto_check_suppressed: bool,
}

impl DomainPolicy {
    pub fn evaluate(hostname: &str, settings: &Settings) -> Self {
        let disabled = DomainUtils::contains(&settings.disabled_domains, hostname);
        let auto_check_on = DomainUtils::contains(&settings.auto_check_on_domains, hostname);
        let ignore_check_on = DomainUtils::contains(&settings.ignore_check_on_domains, hostname);

        Self {
            disabled,
            auto_check: auto_check_on || (settings.auto_check && !ignore_check_on),
            auto_check_suppressed: ignore_check_on,
        }
    }

    /// Policy for a full page URL; pages without a hostname get no policy.
    pub fn for_page(page_url: &str, settings: &Settings) -> Self {
        match DomainUtils::hostname(page_url) {
            Some(hostname) => Self::evaluate(&hostname, settings),
            None => Self::default(),
        }
    }

    /// Whether checking may be offered at all.
    pub fn check_offered(&self) -> bool {
        !self.disabled
    }
}

/// `disabled_domains` without the given hostname.
pub fn without_domain(domains: &[String], hostname: &str) -> Vec<String> {
    domains
        .iter()
        .filter(|d| *d != hostname)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings::default()
    }

    #[test]
    fn test_unknown_host_follows_global_flag() {
        let mut s = settings();
        assert_eq!(
            DomainPolicy::evaluate("example.com", &s),
            DomainPolicy::default()
        );

        s.auto_check = true;
        assert!(DomainPolicy::evaluate("example.com", &s).auto_check);
    }

    #[test]
    fn test_auto_check_on_domain_without_global_flag() {
        let s = Settings {
            auto_check_on_domains: vec!["mail.example.com".to_string()],
            ..settings()
        };
        let policy = DomainPolicy::evaluate("mail.example.com", &s);
        assert!(policy.auto_check);
        assert!(!policy.disabled);
    }

    #[test]
    fn test_ignore_check_on_overrides_global_flag() {
        let s = Settings {
            auto_check: true,
            ignore_check_on_domains: vec!["example.com".to_string()],
            ..settings()
        };
        let policy = DomainPolicy::evaluate("example.com", &s);
        assert!(!policy.auto_check);
        assert!(policy.auto_check_suppressed);
    }

    #[test]
    fn test_disabled_takes_precedence_over_auto_check() {
        let s = Settings {
            disabled_domains: vec!["example.com".to_string()],
            auto_check_on_domains: vec!["example.com".to_string()],
            ..settings()
        };
        let policy = DomainPolicy::evaluate("example.com", &s);
        assert!(policy.disabled);
        assert!(policy.auto_check);
        assert!(!policy.check_offered());
    }

    #[test]
    fn test_for_page_uses_hostname() {
        let s = Settings {
            disabled_domains: vec!["www.example.com".to_string()],
            ..settings()
        };
        assert!(DomainPolicy::for_page("https://www.example.com/a/b", &s).disabled);
        assert!(!DomainPolicy::for_page("file:///tmp/x.html", &s).disabled);
    }

    #[test]
    fn test_without_domain() {
        let domains = vec!["a.com".to_string(), "b.com".to_string(), "A.com".to_string()];
        assert_eq!(
            without_domain(&domains, "a.com"),
            vec!["b.com".to_string(), "A.com".to_string()]
        );
    }

    #[test]
    fn test_membership_is_exact() {
        let s = Settings {
            disabled_domains: vec!["Example.com".to_string()],
            ..settings()
        };
        assert!(!DomainPolicy::evaluate("example.com", &s).disabled);
        assert!(DomainPolicy::evaluate("Example.com", &s).disabled);
    }
}
