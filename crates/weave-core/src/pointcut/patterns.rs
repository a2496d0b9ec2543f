//! Name, regex and attribute method matchers

use regex::Regex;

use crate::error::{AopError, AopResult};
use crate::types::{Attribute, Method, TypeDescriptor};

use super::method_matcher::MethodMatcher;

/// Match `text` against a pattern where `*` stands for any run of characters
pub fn simple_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == text;
    }

    let first = parts[0];
    let last = parts[parts.len() - 1];
    if !text.starts_with(first) {
        return false;
    }
    let mut rest = &text[first.len()..];
    if rest.len() < last.len() || !rest.ends_with(last) {
        return false;
    }
    rest = &rest[..rest.len() - last.len()];

    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        match rest.find(part) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }
    true
}

/// Matches methods whose name fits one of a set of wildcard patterns
#[derive(Debug, Clone, Default)]
pub struct NameMatchMethodMatcher {
    patterns: Vec<String>,
}

impl NameMatchMethodMatcher {
    /// Create a matcher from patterns such as `Load*`, `*Async` or `Get*By*`
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        NameMatchMethodMatcher {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    /// Add another pattern
    pub fn add_pattern(&mut self, pattern: impl Into<String>) {
        self.patterns.push(pattern.into());
    }

    /// Configured patterns
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl MethodMatcher for NameMatchMethodMatcher {
    fn matches_static(&self, method: &Method, _target_type: Option<&TypeDescriptor>) -> bool {
        self.patterns
            .iter()
            .any(|pattern| simple_match(pattern, method.name()))
    }

    fn describe(&self) -> String {
        format!("NameMatch({})", self.patterns.join(", "))
    }
}

/// Matches `Type.Method` against regular expressions
///
/// Each pattern must match the whole qualified name. `Type` is the target
/// type when known, otherwise the method's declaring type.
#[derive(Debug, Clone)]
pub struct RegexMethodMatcher {
    patterns: Vec<Regex>,
    exclusions: Vec<Regex>,
}

fn compile_anchored(pattern: &str) -> AopResult<Regex> {
    Regex::new(&format!("^(?:{})$", pattern)).map_err(|source| AopError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

impl RegexMethodMatcher {
    /// Compile the inclusion patterns
    pub fn new<I, S>(patterns: I) -> AopResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| compile_anchored(p.as_ref()))
            .collect::<AopResult<Vec<_>>>()?;
        Ok(RegexMethodMatcher {
            patterns,
            exclusions: Vec::new(),
        })
    }

    /// Add exclusion patterns; a name matching any of them never matches
    pub fn excluding<I, S>(mut self, exclusions: I) -> AopResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for pattern in exclusions {
            self.exclusions.push(compile_anchored(pattern.as_ref())?);
        }
        Ok(self)
    }

    fn qualified_name(method: &Method, target_type: Option<&TypeDescriptor>) -> String {
        let type_name = match target_type {
            Some(ty) => ty.name().as_str(),
            None => method.declaring_type().as_str(),
        };
        format!("{}.{}", type_name, method.name())
    }
}

impl MethodMatcher for RegexMethodMatcher {
    fn matches_static(&self, method: &Method, target_type: Option<&TypeDescriptor>) -> bool {
        let name = Self::qualified_name(method, target_type);
        self.patterns.iter().any(|re| re.is_match(&name))
            && !self.exclusions.iter().any(|re| re.is_match(&name))
    }

    fn describe(&self) -> String {
        let parts: Vec<&str> = self.patterns.iter().map(|re| re.as_str()).collect();
        format!("Regex({})", parts.join(", "))
    }
}

/// Matches methods that carry an attribute
#[derive(Debug, Clone)]
pub struct AttributeMethodMatcher {
    attribute: Attribute,
}

impl AttributeMethodMatcher {
    /// Create a matcher for `attribute`
    pub fn new(attribute: impl Into<Attribute>) -> Self {
        AttributeMethodMatcher {
            attribute: attribute.into(),
        }
    }
}

impl MethodMatcher for AttributeMethodMatcher {
    fn matches_static(&self, method: &Method, _target_type: Option<&TypeDescriptor>) -> bool {
        method.has_attribute(&self.attribute)
    }

    fn describe(&self) -> String {
        format!("Attribute({})", self.attribute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_match() {
        assert!(simple_match("Load", "Load"));
        assert!(!simple_match("Load", "LoadAll"));
        assert!(simple_match("Load*", "LoadAll"));
        assert!(simple_match("*Async", "SaveAsync"));
        assert!(!simple_match("*Async", "Save"));
        assert!(simple_match("Get*By*", "GetUserById"));
        assert!(!simple_match("Get*By*", "GetUser"));
        assert!(simple_match("*", "anything"));
        assert!(simple_match("a*a", "aa"));
        assert!(!simple_match("ab*ba", "aba"));
    }

    #[test]
    fn test_name_match() {
        let m = NameMatchMethodMatcher::new(["Load*", "Save"]);
        assert!(m.matches_static(&Method::new("IStore", "LoadAll"), None));
        assert!(m.matches_static(&Method::new("IStore", "Save"), None));
        assert!(!m.matches_static(&Method::new("IStore", "SaveAll"), None));
        assert!(!m.is_runtime());
    }

    #[test]
    fn test_regex_uses_target_type_when_known() {
        let m = RegexMethodMatcher::new([r"File.*\.Load"]).unwrap();
        let load = Method::new("IStore", "Load");
        assert!(!m.matches_static(&load, None));
        assert!(m.matches_static(&load, Some(&TypeDescriptor::new("FileStore"))));
    }

    #[test]
    fn test_regex_falls_back_to_declaring_type() {
        let m = RegexMethodMatcher::new([r"IStore\..*"]).unwrap();
        assert!(m.matches_static(&Method::new("IStore", "Load"), None));
    }

    #[test]
    fn test_regex_is_anchored() {
        let m = RegexMethodMatcher::new(["Store.Load"]).unwrap();
        assert!(!m.matches_static(&Method::new("Store", "LoadAll"), None));
    }

    #[test]
    fn test_regex_exclusions() {
        let m = RegexMethodMatcher::new([r"IStore\..*"])
            .unwrap()
            .excluding([r".*\.Dispose"])
            .unwrap();
        assert!(m.matches_static(&Method::new("IStore", "Load"), None));
        assert!(!m.matches_static(&Method::new("IStore", "Dispose"), None));
    }

    #[test]
    fn test_regex_invalid_pattern() {
        let err = RegexMethodMatcher::new(["(unclosed"]).unwrap_err();
        assert!(matches!(err, AopError::InvalidPattern { .. }));
    }

    #[test]
    fn test_attribute_match() {
        let m = AttributeMethodMatcher::new("Cache");
        assert!(m.matches_static(&Method::new("IStore", "Load").with_attribute("Cache"), None));
        assert!(!m.matches_static(&Method::new("IStore", "Load"), None));
    }
}
