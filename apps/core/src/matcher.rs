use regex::{Regex, RegexBuilder};
use url::Url;

use crate::model::{MatchType, Rule};

/// A URL as received, plus its parsed form for host and port lookups.
///
/// `Url` drops a port equal to the scheme default (`https://h:443/` reports
/// no port), so the literal port is recovered from the raw authority.
/// Text patterns run against the raw input, never the normalized `Url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUrl {
    raw: String,
    url: Url,
    written_port: Option<u16>,
}

impl TargetUrl {
    pub fn parse(raw: &str) -> Result<Self, url::ParseError> {
        let trimmed = raw.trim();
        let url = Url::parse(trimmed)?;
        let written_port = url.port().or_else(|| {
            if authority_has_port(trimmed) {
                url.port_or_known_default()
            } else {
                None
            }
        });
        Ok(Self {
            raw: trimmed.to_string(),
            url,
            written_port,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }

    pub fn written_port(&self) -> Option<u16> {
        self.written_port
    }

    /// The URL as written, without its fragment.
    pub fn serialized(&self) -> &str {
        self.raw
            .split_once('#')
            .map(|(head, _)| head)
            .unwrap_or(&self.raw)
    }
}

fn authority_has_port(raw: &str) -> bool {
    let Some((_, rest)) = raw.split_once("://") else {
        return false;
    };
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit('@').next().unwrap_or_default();
    let after_host = match host_port.strip_prefix('[') {
        Some(bracketed) => bracketed.split_once(']').map(|(_, tail)| tail).unwrap_or_default(),
        None => host_port,
    };
    after_host
        .rsplit_once(':')
        .map(|(_, port)| !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}

pub fn matches(target: &TargetUrl, rule: &Rule) -> bool {
    if !rule.enabled {
        return false;
    }

    if let Some(range) = rule.port_range {
        match target.written_port() {
            Some(port) if range.contains(port) => {}
            _ => return false,
        }
    }

    match rule.match_type {
        MatchType::Contains => match_contains(target, &rule.pattern),
        MatchType::Domain => match_domain(target, &rule.pattern),
        MatchType::Wildcard => compile(&wildcard_to_regex(&rule.pattern))
            .map(|re| re.is_match(target.serialized()))
            .unwrap_or(false),
        MatchType::Regex => compile(&rule.pattern)
            .map(|re| re.is_match(target.serialized()))
            .unwrap_or(false),
    }
}

/// Compile error for regex and wildcard rules, for editors to surface.
/// Matching itself never reports this; a broken rule just never fires.
pub fn pattern_error(rule: &Rule) -> Option<String> {
    let source = match rule.match_type {
        MatchType::Regex => rule.pattern.clone(),
        MatchType::Wildcard => wildcard_to_regex(&rule.pattern),
        MatchType::Contains | MatchType::Domain => return None,
    };
    compile(&source).err().map(|error| error.to_string())
}

fn match_contains(target: &TargetUrl, pattern: &str) -> bool {
    target
        .serialized()
        .to_lowercase()
        .contains(&pattern.to_lowercase())
}

fn match_domain(target: &TargetUrl, pattern: &str) -> bool {
    let Some(host) = target.host() else {
        return false;
    };
    let host = strip_www(&host.to_lowercase());
    let pattern = strip_www(&pattern.trim().to_lowercase());
    if pattern.is_empty() {
        return false;
    }
    host == pattern || host.ends_with(&format!(".{pattern}"))
}

fn strip_www(value: &str) -> String {
    value.strip_prefix("www.").unwrap_or(value).to_string()
}

fn wildcard_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    out.push('$');
    out
}

fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

#[cfg(test)]
mod tests {
    use super::{authority_has_port, wildcard_to_regex, TargetUrl};

    #[test]
    fn wildcard_escapes_everything_but_star_and_question_mark() {
        assert_eq!(wildcard_to_regex("a.b*c?"), r"^a\.b.*c.$");
        assert_eq!(wildcard_to_regex("(x)+"), r"^\(x\)\+$");
    }

    #[test]
    fn serialized_keeps_the_written_text_without_fragment() {
        let target = TargetUrl::parse("  https://GitHub.com:443/x?q=1#top ").unwrap();
        assert_eq!(target.serialized(), "https://GitHub.com:443/x?q=1");
        assert_eq!(target.host(), Some("github.com"));
        assert_eq!(target.written_port(), Some(443));

        let bare = TargetUrl::parse("https://github.com").unwrap();
        assert_eq!(bare.serialized(), "https://github.com");
    }

    #[test]
    fn detects_written_ports_in_authority() {
        assert!(authority_has_port("https://example.com:443/x"));
        assert!(authority_has_port("http://user:pw@example.com:8080"));
        assert!(authority_has_port("http://[::1]:3000/"));
        assert!(!authority_has_port("http://[::1]/"));
        assert!(!authority_has_port("http://user:pw@example.com/"));
        assert!(!authority_has_port("https://example.com/a:b"));
        assert!(!authority_has_port("mailto:someone@example.com"));
    }
}
