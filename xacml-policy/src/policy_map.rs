//! Policy lookup by id and version pattern.

use std::collections::HashMap;
use std::sync::Arc;

use xacml_core::{PolicyVersion, VersionPatterns};

/// Versions of one policy, sorted latest first.
#[derive(Debug, Clone)]
pub struct PolicyVersions<P> {
    versions: Vec<(PolicyVersion, P)>,
}

impl<P> PolicyVersions<P> {
    pub fn new(mut versions: Vec<(PolicyVersion, P)>) -> Self {
        versions.sort_by(|(a, _), (b, _)| b.cmp(a));
        Self { versions }
    }

    /// The latest version matching the patterns (all versions match when
    /// `patterns` is `None`).
    pub fn latest(&self, patterns: Option<&VersionPatterns>) -> Option<(&PolicyVersion, &P)> {
        self.versions
            .iter()
            .find(|(version, _)| patterns.is_none_or(|p| p.matches(version)))
            .map(|(version, policy)| (version, policy))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PolicyVersion, &P)> {
        self.versions.iter().map(|(v, p)| (v, p))
    }
}

/// Map from Policy(Set)Id to its sorted versions; the resolver's view of
/// every policy available for referencing.
#[derive(Debug, Clone, Default)]
pub struct PolicyMap<P> {
    by_id: HashMap<Arc<str>, PolicyVersions<P>>,
}

impl<P> PolicyMap<P> {
    pub fn new(policies: impl IntoIterator<Item = (String, PolicyVersion, P)>) -> Self {
        let mut grouped: HashMap<Arc<str>, Vec<(PolicyVersion, P)>> = HashMap::new();
        for (id, version, policy) in policies {
            grouped
                .entry(Arc::from(id.as_str()))
                .or_default()
                .push((version, policy));
        }
        Self {
            by_id: grouped
                .into_iter()
                .map(|(id, versions)| (id, PolicyVersions::new(versions)))
                .collect(),
        }
    }

    /// The latest (version, policy) for `id` matching the patterns.
    pub fn get(
        &self,
        id: &str,
        patterns: Option<&VersionPatterns>,
    ) -> Option<(&PolicyVersion, &P)> {
        self.by_id.get(id)?.latest(patterns)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Arc<str>, &PolicyVersions<P>)> {
        self.by_id.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
