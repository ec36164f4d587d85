//! Policy versions and version-match patterns.
//!
//! A version is a dotted numeric sequence ordered component-by-component.
//! A pattern is a dotted sequence where `*` matches exactly one component
//! and `+` matches one or more. `VersionPatterns` bundles the three
//! constraints a policy reference may impose: exact match (`version`),
//! inclusive lower bound (`earliest`), inclusive upper bound (`latest`).

use std::cmp::Ordering;
use std::fmt;

/// A policy version: one or more dot-separated non-negative integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PolicyVersion {
    components: Vec<u64>,
}

impl PolicyVersion {
    pub fn parse(s: &str) -> Result<Self, String> {
        if s.is_empty() {
            return Err("empty version".to_string());
        }
        let components = s
            .split('.')
            .map(|c| c.parse::<u64>().map_err(|_| format!("invalid version: {s}")))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { components })
    }

    pub fn components(&self) -> &[u64] {
        &self.components
    }
}

impl Ord for PolicyVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        // Component-wise numeric; a shorter version that is a prefix of a
        // longer one is earlier (1.2 < 1.2.0).
        self.components.cmp(&other.components)
    }
}

impl PartialOrd for PolicyVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PolicyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, c) in self.components.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PatternComponent {
    /// A literal number.
    Num(u64),
    /// `*`: exactly one component, any value.
    Any,
    /// `+`: one or more components, any values.
    AnyPlus,
}

/// A wildcarded version pattern, e.g. `1.*`, `1.2.+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionPattern {
    components: Vec<PatternComponent>,
}

impl VersionPattern {
    pub fn parse(s: &str) -> Result<Self, String> {
        if s.is_empty() {
            return Err("empty version pattern".to_string());
        }
        let components = s
            .split('.')
            .map(|c| match c {
                "*" => Ok(PatternComponent::Any),
                "+" => Ok(PatternComponent::AnyPlus),
                n => n
                    .parse::<u64>()
                    .map(PatternComponent::Num)
                    .map_err(|_| format!("invalid version pattern: {s}")),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { components })
    }

    /// Exact pattern match.
    pub fn matches(&self, version: &PolicyVersion) -> bool {
        fn go(pattern: &[PatternComponent], version: &[u64]) -> bool {
            match pattern.split_first() {
                None => version.is_empty(),
                Some((PatternComponent::Num(n), rest)) => {
                    version.split_first().is_some_and(|(v, vs)| v == n && go(rest, vs))
                }
                Some((PatternComponent::Any, rest)) => {
                    version.split_first().is_some_and(|(_, vs)| go(rest, vs))
                }
                Some((PatternComponent::AnyPlus, rest)) => {
                    // consume one or more components
                    (1..=version.len()).any(|k| go(rest, &version[k..]))
                }
            }
        }
        go(&self.components, version.components())
    }

    /// True iff `version` matches the pattern or is later than it (used for
    /// an EarliestVersion lower bound).
    pub fn is_later_or_matches(&self, version: &PolicyVersion) -> bool {
        let v = version.components();
        for (i, p) in self.components.iter().enumerate() {
            let Some(&vc) = v.get(i) else {
                // version ran out first -> earlier than the pattern
                return false;
            };
            match p {
                PatternComponent::AnyPlus => return true,
                PatternComponent::Any => continue,
                PatternComponent::Num(n) => match vc.cmp(n) {
                    Ordering::Greater => return true,
                    Ordering::Less => return false,
                    Ordering::Equal => continue,
                },
            }
        }
        // All pattern components matched; any extra version components only
        // make it later.
        true
    }

    /// True iff `version` matches the pattern or is earlier than it (used
    /// for a LatestVersion upper bound).
    pub fn is_earlier_or_matches(&self, version: &PolicyVersion) -> bool {
        let v = version.components();
        for (i, p) in self.components.iter().enumerate() {
            let Some(&vc) = v.get(i) else {
                // version is a strict prefix -> earlier
                return true;
            };
            match p {
                PatternComponent::AnyPlus => return true,
                PatternComponent::Any => continue,
                PatternComponent::Num(n) => match vc.cmp(n) {
                    Ordering::Less => return true,
                    Ordering::Greater => return false,
                    Ordering::Equal => continue,
                },
            }
        }
        // Pattern exhausted: equal-length versions match; longer ones are
        // later than the bound.
        v.len() <= self.components.len()
    }
}

impl fmt::Display for VersionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, c) in self.components.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            match c {
                PatternComponent::Num(n) => write!(f, "{n}")?,
                PatternComponent::Any => write!(f, "*")?,
                PatternComponent::AnyPlus => write!(f, "+")?,
            }
        }
        Ok(())
    }
}

/// The version constraints of a policy reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionPatterns {
    pub version: Option<VersionPattern>,
    pub earliest: Option<VersionPattern>,
    pub latest: Option<VersionPattern>,
}

impl VersionPatterns {
    pub fn matches(&self, version: &PolicyVersion) -> bool {
        self.version.as_ref().is_none_or(|p| p.matches(version))
            && self.earliest.as_ref().is_none_or(|p| p.is_later_or_matches(version))
            && self.latest.as_ref().is_none_or(|p| p.is_earlier_or_matches(version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> PolicyVersion {
        PolicyVersion::parse(s).unwrap()
    }

    fn p(s: &str) -> VersionPattern {
        VersionPattern::parse(s).unwrap()
    }

    #[test]
    fn version_ordering_is_numeric_per_component() {
        assert!(v("1.10") > v("1.9"));
        assert!(v("1.2") < v("1.2.0"));
        assert!(v("2") > v("1.999.999"));
    }

    #[test]
    fn exact_pattern() {
        assert!(p("1.2.3").matches(&v("1.2.3")));
        assert!(!p("1.2.3").matches(&v("1.2.4")));
        assert!(!p("1.2.3").matches(&v("1.2")));
    }

    #[test]
    fn star_matches_one_component() {
        assert!(p("1.*").matches(&v("1.9")));
        assert!(!p("1.*").matches(&v("1")));
        assert!(!p("1.*").matches(&v("1.2.3")));
        assert!(p("1.*.3").matches(&v("1.5.3")));
    }

    #[test]
    fn plus_matches_one_or_more() {
        assert!(p("1.+").matches(&v("1.2")));
        assert!(p("1.+").matches(&v("1.2.3.4")));
        assert!(!p("1.+").matches(&v("1")));
        assert!(p("1.+.9").matches(&v("1.2.3.9")));
    }

    #[test]
    fn earliest_bound() {
        let earliest = p("1.2");
        assert!(earliest.is_later_or_matches(&v("1.2")));
        assert!(earliest.is_later_or_matches(&v("1.3")));
        assert!(earliest.is_later_or_matches(&v("1.2.1")));
        assert!(!earliest.is_later_or_matches(&v("1.1")));
        assert!(!earliest.is_later_or_matches(&v("1")));
    }

    #[test]
    fn latest_bound() {
        let latest = p("1.5");
        assert!(latest.is_earlier_or_matches(&v("1.5")));
        assert!(latest.is_earlier_or_matches(&v("1.4.9")));
        assert!(latest.is_earlier_or_matches(&v("1")));
        assert!(!latest.is_earlier_or_matches(&v("1.5.1")));
        assert!(!latest.is_earlier_or_matches(&v("1.6")));
    }

    #[test]
    fn combined_patterns() {
        // Spec scenario: version="1.*", earliest="1.2"
        let patterns = VersionPatterns {
            version: Some(p("1.*")),
            earliest: Some(p("1.2")),
            latest: None,
        };
        assert!(patterns.matches(&v("1.2")));
        assert!(patterns.matches(&v("1.9")));
        assert!(!patterns.matches(&v("1.1")));
        assert!(!patterns.matches(&v("2.0")));
    }
}
