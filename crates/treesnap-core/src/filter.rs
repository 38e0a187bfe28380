//! Case-insensitive suffix filters for cataloging.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An ordered set of file-name suffixes, such as `.log` or `.cfg`.
///
/// An empty spec accepts every name. Matching is a plain case-insensitive
/// `ends_with` on the base name; there is no glob or regex syntax.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct FilterSpec {
    /// Suffixes as given, for display.
    suffixes: Vec<String>,
    /// Lower-cased suffixes, parallel to `suffixes`.
    folded: Vec<String>,
}

impl FilterSpec {
    /// Build a spec from suffixes. Empty strings and case-insensitive
    /// duplicates are dropped; the first spelling wins.
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut spec = Self::default();
        for suffix in suffixes {
            let suffix = suffix.into();
            if suffix.is_empty() {
                continue;
            }
            let lower = suffix.to_lowercase();
            if !spec.folded.contains(&lower) {
                spec.folded.push(lower);
                spec.suffixes.push(suffix);
            }
        }
        spec
    }

    /// A spec that accepts everything.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.suffixes.is_empty()
    }

    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }

    /// Whether `name` ends with one of the suffixes, ignoring case.
    pub fn matches(&self, name: &str) -> bool {
        if self.folded.is_empty() {
            return true;
        }
        let name = name.to_lowercase();
        self.folded.iter().any(|suffix| name.ends_with(suffix.as_str()))
    }
}

/// Match `name` against an optional spec; `None` accepts every name.
pub fn matches(name: &str, spec: Option<&FilterSpec>) -> bool {
    spec.is_none_or(|spec| spec.matches(name))
}

impl fmt::Display for FilterSpec {
    /// Renders `None` for an empty spec, otherwise `['.log', '.cfg']`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.suffixes.is_empty() {
            return f.write_str("None");
        }
        f.write_str("[")?;
        for (i, suffix) in self.suffixes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "'{suffix}'")?;
        }
        f.write_str("]")
    }
}

impl From<Vec<String>> for FilterSpec {
    fn from(suffixes: Vec<String>) -> Self {
        Self::new(suffixes)
    }
}

impl From<FilterSpec> for Vec<String> {
    fn from(spec: FilterSpec) -> Self {
        spec.suffixes
    }
}

impl<S: Into<String>> FromIterator<S> for FilterSpec {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_matches_everything() {
        let spec = FilterSpec::all();
        assert!(spec.matches("anything.bin"));
        assert!(spec.matches(""));
        assert!(matches("x", None));
    }

    #[test]
    fn test_case_insensitive_suffix() {
        let spec = FilterSpec::new([".log", ".CFG"]);
        assert!(spec.matches("app.LOG"));
        assert!(spec.matches("server.cfg"));
        assert!(spec.matches("Server.Cfg"));
        assert!(!spec.matches("notes.txt"));
        assert!(!spec.matches("log"));
    }

    #[test]
    fn test_suffix_is_not_a_glob() {
        let spec = FilterSpec::new(["*.log"]);
        assert!(!spec.matches("a.log"));
        assert!(spec.matches("weird*.log"));
    }

    #[test]
    fn test_duplicates_and_empties_dropped() {
        let spec = FilterSpec::new([".log", "", ".LOG", ".cfg"]);
        assert_eq!(spec.suffixes(), &[".log".to_string(), ".cfg".to_string()]);
    }

    #[test]
    fn test_display() {
        assert_eq!(FilterSpec::all().to_string(), "None");
        assert_eq!(
            FilterSpec::new([".log", ".cfg"]).to_string(),
            "['.log', '.cfg']"
        );
    }
}
