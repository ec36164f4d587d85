//! PDP configuration.

use serde::Deserialize;
use xacml_core::{PdpError, Result};
use xacml_eval::EvalLimits;

/// Engine configuration, deserializable from JSON. Defaults follow XACML's
/// permissive request handling: lax issuer matching, attribute duplicates
/// allowed.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PdpConfig {
    /// Strict issuer matching: a designator without Issuer only matches
    /// request attributes without Issuer. Lax (default): it also matches
    /// attributes carrying any issuer.
    pub strict_attribute_issuer_match: bool,
    /// Allow repeated `<Attribute>` with identical (id, issuer, datatype)
    /// in one category; their values merge into one bag. When false, such
    /// repetition is a syntax error.
    pub allow_attribute_duplicates: bool,
    /// Maximum values per attribute bag.
    pub max_attribute_bag_size: usize,
    /// Maximum Cartesian product a higher-order bag function may
    /// enumerate.
    pub max_higher_order_product: usize,
    /// Maximum VariableReference chain depth.
    pub max_variable_ref_depth: usize,
    /// Maximum Policy(Set)IdReference chain depth.
    pub max_policy_ref_depth: usize,
    /// Populate the applicable-policy list of every result even when the
    /// request does not ask for it.
    pub return_applicable_policies: bool,
}

impl Default for PdpConfig {
    fn default() -> Self {
        Self {
            strict_attribute_issuer_match: false,
            allow_attribute_duplicates: true,
            max_attribute_bag_size: 1000,
            max_higher_order_product: 1_000_000,
            max_variable_ref_depth: 10,
            max_policy_ref_depth: 10,
            return_applicable_policies: false,
        }
    }
}

impl PdpConfig {
    /// Loads configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| PdpError::InvalidConfig(format!("{}: {e}", path.as_ref().display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| PdpError::InvalidConfig(format!("{}: {e}", path.as_ref().display())))
    }

    pub fn eval_limits(&self) -> EvalLimits {
        EvalLimits {
            max_attribute_bag_size: self.max_attribute_bag_size,
            max_higher_order_product: self.max_higher_order_product,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_lax() {
        let config = PdpConfig::default();
        assert!(!config.strict_attribute_issuer_match);
        assert!(config.allow_attribute_duplicates);
    }

    #[test]
    fn deserializes_partial_json() {
        let config: PdpConfig =
            serde_json::from_str(r#"{"strict_attribute_issuer_match": true}"#).unwrap();
        assert!(config.strict_attribute_issuer_match);
        assert_eq!(config.max_attribute_bag_size, 1000);
    }

    #[test]
    fn unknown_fields_rejected() {
        let parsed: std::result::Result<PdpConfig, _> =
            serde_json::from_str(r#"{"no_such_option": 1}"#);
        assert!(parsed.is_err());
    }
}
