//! Content security policy parsing for the dev-mode manifest.

use std::fmt;

/// Directives serialized first, in this order. The rest keep their order.
const DIRECTIVE_ORDER: [&str; 3] = ["default-src", "script-src", "object-src"];

/// Default `extension_pages` policy for MV3.
pub const DEFAULT_MV3_CSP: &str = "script-src 'self' 'wasm-unsafe-eval'; object-src 'self';";

/// Default policy for MV2.
pub const DEFAULT_MV2_CSP: &str = "script-src 'self'; object-src 'self';";

/// A parsed content security policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentSecurityPolicy {
    directives: Vec<(String, Vec<String>)>,
}

impl ContentSecurityPolicy {
    pub fn parse(policy: &str) -> Self {
        let mut csp = Self::default();
        for section in policy.split(';') {
            let mut parts = section.split_whitespace();
            let Some(name) = parts.next() else {
                continue;
            };
            let values: Vec<String> = parts.map(str::to_string).collect();
            match csp.directives.iter_mut().find(|(existing, _)| existing == name) {
                Some((_, existing)) => *existing = values,
                None => csp.directives.push((name.to_string(), values)),
            }
        }
        csp
    }

    /// Add `value` to `directive` unless already present.
    pub fn add(&mut self, directive: &str, value: &str) -> &mut Self {
        match self.directives.iter_mut().find(|(name, _)| name == directive) {
            Some((_, values)) => {
                if !values.iter().any(|v| v == value) {
                    values.push(value.to_string());
                }
            }
            None => self
                .directives
                .push((directive.to_string(), vec![value.to_string()])),
        }
        self
    }

    pub fn get(&self, directive: &str) -> Option<&[String]> {
        self.directives
            .iter()
            .find(|(name, _)| name == directive)
            .map(|(_, values)| values.as_slice())
    }
}

impl fmt::Display for ContentSecurityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rank = |name: &str| {
            DIRECTIVE_ORDER
                .iter()
                .position(|ordered| *ordered == name)
                .unwrap_or(DIRECTIVE_ORDER.len())
        };
        let mut directives: Vec<_> = self.directives.iter().collect();
        // Stable sort keeps the original order among unranked directives.
        directives.sort_by_key(|(name, _)| rank(name));

        let rendered: Vec<String> = directives
            .into_iter()
            .map(|(name, values)| {
                std::iter::once(name.as_str())
                    .chain(values.iter().map(String::as_str))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();
        write!(f, "{};", rendered.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_defaults() {
        assert_eq!(ContentSecurityPolicy::parse(DEFAULT_MV3_CSP).to_string(), DEFAULT_MV3_CSP);
        assert_eq!(ContentSecurityPolicy::parse(DEFAULT_MV2_CSP).to_string(), DEFAULT_MV2_CSP);
    }

    #[test]
    fn add_is_idempotent() {
        let mut csp = ContentSecurityPolicy::parse(DEFAULT_MV3_CSP);
        csp.add("script-src", "http://localhost:3000");
        csp.add("script-src", "http://localhost:3000");
        assert_eq!(
            csp.to_string(),
            "script-src 'self' 'wasm-unsafe-eval' http://localhost:3000; object-src 'self';"
        );
    }

    #[test]
    fn known_directives_come_first() {
        let csp = ContentSecurityPolicy::parse(
            "img-src *; object-src 'none'; frame-src https:; script-src 'self'; default-src 'self'",
        );
        assert_eq!(
            csp.to_string(),
            "default-src 'self'; script-src 'self'; object-src 'none'; img-src *; frame-src https:;"
        );
    }

    #[test]
    fn add_creates_missing_directive() {
        let mut csp = ContentSecurityPolicy::parse("object-src 'self';");
        csp.add("script-src", "http://localhost:3000");
        assert_eq!(csp.get("script-src"), Some(&["http://localhost:3000".to_string()][..]));
        assert_eq!(
            csp.to_string(),
            "script-src http://localhost:3000; object-src 'self';"
        );
    }
}
