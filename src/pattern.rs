//! Declarative path patterns.
//!
//! | Pattern fragment | Matches |
//! |---|---|
//! | `{name}` | one or more non-`/` characters, captured as `name` |
//! | trailing `/*` or `*` | nothing, or `/` followed by anything |
//! | trailing `/` | an optional trailing slash |
//! | anything else | itself, literally |
//!
//! Matching is anchored: the whole path must match, never a substring.
//!
//! ```rust
//! use shallot::PathPattern;
//!
//! let p = PathPattern::compile("/users/{userId}/friends/{friendId}/*").unwrap();
//! let params = p.matches("/users/1/friends/2/optional").unwrap();
//! assert_eq!(params["userId"], "1");
//! assert_eq!(params["friendId"], "2");
//! ```

use std::collections::HashMap;

use regex::Regex;

use crate::error::PatternError;

/// Named path parameters captured by a match.
pub type Params = HashMap<String, String>;

/// A compiled path pattern.
#[derive(Clone, Debug)]
pub struct PathPattern {
    regex: Regex,
}

impl PathPattern {
    /// Compiles a pattern string. See the [module docs](self) for the grammar.
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        let (head, tail) = if let Some(head) = pattern.strip_suffix("/*") {
            (head, "(?:/.*)?")
        } else if let Some(head) = pattern.strip_suffix('*') {
            (head, "(?:/.*)?")
        } else if let Some(head) = pattern.strip_suffix('/') {
            (head, "/?")
        } else {
            (pattern, "")
        };

        let mut source = String::with_capacity(pattern.len() * 2);
        source.push('^');

        let mut rest = head;
        while let Some(open) = rest.find('{') {
            source.push_str(&regex::escape(&rest[..open]));
            let after = &rest[open + 1..];
            let close = after
                .find('}')
                .ok_or_else(|| PatternError::UnclosedParameter(pattern.to_owned()))?;
            let name = &after[..close];
            if !is_identifier(name) {
                return Err(PatternError::InvalidParameter {
                    pattern: pattern.to_owned(),
                    name: name.to_owned(),
                });
            }
            source.push_str(&format!("(?P<{name}>[^/]+)"));
            rest = &after[close + 1..];
        }
        source.push_str(&regex::escape(rest));
        source.push_str(tail);
        source.push('$');

        Ok(Self { regex: Regex::new(&source)? })
    }

    /// Wraps a hand-written regex. Its named groups become path parameters.
    ///
    /// The regex is used as given: anchor it yourself if you want whole-path
    /// matching.
    pub fn from_regex(regex: Regex) -> Self {
        Self { regex }
    }

    /// Tests `path`, returning the captured parameters on success.
    ///
    /// Groups that did not participate in the match are left out.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let caps = self.regex.captures(path)?;
        let params = self.regex
            .capture_names()
            .flatten()
            .filter_map(|name| caps.name(name).map(|m| (name.to_owned(), m.as_str().to_owned())))
            .collect();
        Some(params)
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(p: &str) -> PathPattern {
        PathPattern::compile(p).unwrap()
    }

    #[test]
    fn root_makes_slash_optional() {
        let p = compile("/");
        assert_eq!(p.as_str(), "^/?$");
        assert!(p.matches("/").is_some());
        assert!(p.matches("").is_some());
        assert!(p.matches("/users").is_none());
    }

    #[test]
    fn bare_star_is_catch_all() {
        let p = compile("*");
        assert_eq!(p.as_str(), "^(?:/.*)?$");
        assert!(p.matches("").is_some());
        assert!(p.matches("/anything/at/all").is_some());
    }

    #[test]
    fn captures_named_parameters() {
        let p = compile("/users/{userId}/friends/{friendId}");
        let params = p.matches("/users/1/friends/2").unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params["userId"], "1");
        assert_eq!(params["friendId"], "2");
        assert!(p.matches("/users/1/friends/2/extra").is_none());
    }

    #[test]
    fn parameters_need_at_least_one_character() {
        assert!(compile("/users/{id}").matches("/users/").is_none());
    }

    #[test]
    fn trailing_wildcard_is_optional() {
        let p = compile("/users/{userId}/friends/{friendId}/*");
        assert!(p.matches("/users/1/friends/2").is_some());
        assert!(p.matches("/users/1/friends/2/optional").is_some());
        assert!(p.matches("/users/1/friends/2/optional/deeper").is_some());
        assert!(p.matches("/users/1/2").is_none());

        let strict = compile("/users/{userId}/friends/{friendId}");
        assert!(strict.matches("/users/1/friends/2/optional").is_none());
    }

    #[test]
    fn bare_star_suffix_requires_slash_boundary() {
        let p = compile("/users*");
        assert!(p.matches("/users").is_some());
        assert!(p.matches("/users/42").is_some());
        assert!(p.matches("/usersx").is_none());
    }

    #[test]
    fn trailing_slash_is_optional() {
        let p = compile("/users/");
        assert_eq!(p.as_str(), "^/users/?$");
        assert!(p.matches("/users").is_some());
        assert!(p.matches("/users/").is_some());
        assert!(p.matches("/users/1").is_none());
    }

    #[test]
    fn anchored_at_both_ends() {
        let p = compile("/users");
        assert!(p.matches("/api/users").is_none());
        assert!(p.matches("/users/1").is_none());
    }

    #[test]
    fn literals_are_escaped() {
        let p = compile("/files/{name}.json");
        assert_eq!(p.matches("/files/report.json").unwrap()["name"], "report");
        assert!(p.matches("/files/reportxjson").is_none());

        assert!(compile("/a+b").matches("/aab").is_none());
        assert!(compile("/a+b").matches("/a+b").is_some());
    }

    #[test]
    fn rejects_malformed_parameters() {
        assert!(matches!(
            PathPattern::compile("/users/{id"),
            Err(PatternError::UnclosedParameter(_)),
        ));
        assert!(matches!(
            PathPattern::compile("/users/{1id}"),
            Err(PatternError::InvalidParameter { .. }),
        ));
        assert!(matches!(
            PathPattern::compile("/users/{}"),
            Err(PatternError::InvalidParameter { .. }),
        ));
        assert!(matches!(
            PathPattern::compile("/{id}/{id}"),
            Err(PatternError::Regex(_)),
        ));
    }

    #[test]
    fn custom_regex_groups_become_params() {
        let p = PathPattern::from_regex(Regex::new(r"^/v(?P<version>\d+)/status$").unwrap());
        assert_eq!(p.matches("/v2/status").unwrap()["version"], "2");
        assert!(p.matches("/vx/status").is_none());
    }
}
