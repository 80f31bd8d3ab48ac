//! Origin allow-list

/// One allow-list entry
#[derive(Debug, Clone, PartialEq, Eq)]
enum OriginPattern {
    Exact(String),
    /// Entry ended in `*`; holds the text before it
    Prefix(String),
}

impl OriginPattern {
    fn matches(&self, origin: &str) -> bool {
        match self {
            OriginPattern::Exact(allowed) => origin == allowed,
            OriginPattern::Prefix(prefix) => origin.starts_with(prefix.as_str()),
        }
    }
}

/// Parsed `allowed_origins` value.
///
/// An empty list places no restriction on callers.
#[derive(Debug, Clone, Default)]
pub struct AllowedOrigins {
    entries: Vec<OriginPattern>,
}

impl AllowedOrigins {
    /// Split on commas, trim, drop empty entries.
    pub fn parse(list: &str) -> Self {
        let entries = list
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| match entry.strip_suffix('*') {
                Some(prefix) => OriginPattern::Prefix(prefix.to_string()),
                None => OriginPattern::Exact(entry.to_string()),
            })
            .collect();
        Self { entries }
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        self.entries.is_empty() || self.entries.iter().any(|entry| entry.matches(origin))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_and_drops_empty() {
        let origins = AllowedOrigins::parse(" http://a , ,https://b,,");
        assert_eq!(origins.len(), 2);
        assert!(origins.is_allowed("http://a"));
        assert!(origins.is_allowed("https://b"));
        assert!(!origins.is_allowed("http://a.evil"));
    }

    #[test]
    fn test_port_wildcard() {
        let origins = AllowedOrigins::parse("http://localhost:*");
        assert!(origins.is_allowed("http://localhost:12345"));
        assert!(origins.is_allowed("http://localhost:3000"));
        assert!(!origins.is_allowed("http://evil.example"));
        assert!(!origins.is_allowed("https://localhost:3000"));
    }

    #[test]
    fn test_bare_star_and_empty_list() {
        assert!(AllowedOrigins::parse("*").is_allowed("http://anything"));
        let empty = AllowedOrigins::parse(" , ");
        assert!(empty.is_empty());
        assert!(empty.is_allowed("http://anything"));
    }
}
