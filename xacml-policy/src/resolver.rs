//! Static policy reference resolution.
//!
//! All referenced policies are known at load time. The resolver compiles
//! them on demand, memoizes by (id, version), tracks the in-progress
//! reference chain to detect cycles, and bounds the chain depth. Any
//! failure is fatal at initialization.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use xacml_core::{PdpError, PolicyVersion, Result, VersionPatterns};

use crate::compile::PolicyCompiler;
use crate::policy::PolicyEvaluator;
use crate::policy_map::PolicyMap;
use crate::tree::{PolicyNode, PolicySetNode};

/// A referencable policy source: the unresolved AST of a Policy or
/// PolicySet registered under its id and version.
#[derive(Debug, Clone)]
pub enum PolicySource {
    Policy(PolicyNode),
    PolicySet(PolicySetNode),
}

impl PolicySource {
    pub fn id(&self) -> &str {
        match self {
            PolicySource::Policy(p) => &p.id,
            PolicySource::PolicySet(ps) => &ps.id,
        }
    }

    pub fn version(&self) -> Result<PolicyVersion> {
        let (id, version) = match self {
            PolicySource::Policy(p) => (&p.id, &p.version),
            PolicySource::PolicySet(ps) => (&ps.id, &ps.version),
        };
        PolicyVersion::parse(version)
            .map_err(|e| PdpError::InvalidArgument(format!("policy '{id}': {e}")))
    }
}

/// Resolves Policy(Set)IdReferences against a static set of sources.
pub struct StaticRefResolver<'a> {
    compiler: &'a PolicyCompiler<'a>,
    sources: PolicyMap<PolicySource>,
    max_ref_depth: usize,
    compiled: RefCell<HashMap<(Arc<str>, PolicyVersion), Arc<PolicyEvaluator>>>,
    /// Ids currently being compiled; a re-entry is a reference cycle.
    in_progress: RefCell<Vec<String>>,
}

impl<'a> StaticRefResolver<'a> {
    pub fn new(
        compiler: &'a PolicyCompiler<'a>,
        sources: impl IntoIterator<Item = PolicySource>,
        max_ref_depth: usize,
    ) -> Result<Self> {
        let entries = sources
            .into_iter()
            .map(|source| {
                let version = source.version()?;
                Ok((source.id().to_string(), version, source))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            compiler,
            sources: PolicyMap::new(entries),
            max_ref_depth,
            compiled: RefCell::new(HashMap::new()),
            in_progress: RefCell::new(Vec::new()),
        })
    }

    /// Resolves one reference to a compiled evaluator.
    pub fn resolve(
        &self,
        id: &str,
        patterns: &VersionPatterns,
    ) -> Result<Arc<PolicyEvaluator>> {
        let (version, source) = self
            .sources
            .get(id, Some(patterns))
            .ok_or_else(|| PdpError::UnresolvedReference(id.to_string()))?;

        let key = (Arc::from(id), version.clone());
        if let Some(compiled) = self.compiled.borrow().get(&key) {
            return Ok(Arc::clone(compiled));
        }

        {
            let mut chain = self.in_progress.borrow_mut();
            if chain.iter().any(|ancestor| ancestor == id) {
                return Err(PdpError::ReferenceCycle(format!(
                    "{} -> {id}",
                    chain.join(" -> ")
                )));
            }
            if chain.len() >= self.max_ref_depth {
                return Err(PdpError::PolicyRefDepthExceeded(self.max_ref_depth));
            }
            chain.push(id.to_string());
        }

        debug!(id, version = %version, "resolving policy reference");
        let source = source.clone();
        let compiled = match &source {
            PolicySource::Policy(p) => self.compiler.compile_policy(p),
            PolicySource::PolicySet(ps) => self.compiler.compile_policy_set(ps, Some(self)),
        };
        self.in_progress.borrow_mut().pop();

        let compiled = compiled?;
        self.compiled.borrow_mut().insert(key, Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Compiles a root PolicySet with this resolver handling its
    /// references.
    pub fn compile_root(&self, root: &PolicySetNode) -> Result<Arc<PolicyEvaluator>> {
        self.compiler.compile_policy_set(root, Some(self))
    }
}
