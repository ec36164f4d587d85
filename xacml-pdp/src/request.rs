//! Request preprocessing: from the parser-neutral request tree to the
//! frozen [`IndividualDecisionRequest`].
//!
//! Enforced here (XACML §7.3.3 / §7.3.5):
//! - at most one category block per category URI (the Multiple Decision
//!   Profile is not supported, so repetition is a syntax error)
//! - duplicate attribute keys merge (lax) or are rejected (strict)
//! - attribute bags are size-bounded and frozen before evaluation
//! - in lax issuer mode, values of issued attributes are additionally
//!   indexed under the issuer-less name, so designators without Issuer
//!   match them

use std::collections::HashMap;
use std::sync::Arc;

use xacml_core::{
    AttributeFqn, AttributeValue, Bag, Datatype, EvalResult, IndeterminateError,
    IndividualDecisionRequest,
};

use crate::config::PdpConfig;

/// A parsed decision request, before preprocessing. Wire adapters
/// (XACML/XML, XACML/JSON) produce this.
#[derive(Debug, Clone, Default)]
pub struct RawRequest {
    pub categories: Vec<RawCategory>,
    /// `ReturnPolicyIdList` from the request.
    pub return_policy_id_list: bool,
}

/// One `<Attributes>` element.
#[derive(Debug, Clone)]
pub struct RawCategory {
    pub category: String,
    /// Raw `<Content>` for XPath selectors, if present.
    pub content: Option<String>,
    pub attributes: Vec<RawAttribute>,
}

/// One `<Attribute>` element with its values in lexical form.
#[derive(Debug, Clone)]
pub struct RawAttribute {
    pub id: String,
    pub issuer: Option<String>,
    pub datatype: Datatype,
    pub values: Vec<String>,
}

/// Validates and freezes a raw request.
pub fn preprocess(
    request: &RawRequest,
    config: &PdpConfig,
) -> EvalResult<IndividualDecisionRequest> {
    let mut named: HashMap<AttributeFqn, (Datatype, Vec<AttributeValue>)> = HashMap::new();
    let mut contents: HashMap<Arc<str>, Arc<str>> = HashMap::new();
    let mut seen_categories: Vec<&str> = Vec::new();

    for block in &request.categories {
        if seen_categories.contains(&block.category.as_str()) {
            return Err(IndeterminateError::syntax_error(format!(
                "unsupported repetition of Attributes[@Category='{}'] \
                 (the Multiple Decision Profile is not supported)",
                block.category
            )));
        }
        seen_categories.push(&block.category);

        if let Some(content) = &block.content {
            contents.insert(
                Arc::from(block.category.as_str()),
                Arc::from(content.as_str()),
            );
        }

        let mut seen_keys: Vec<(&str, Option<&str>, Datatype)> = Vec::new();
        for attribute in &block.attributes {
            let key = (
                attribute.id.as_str(),
                attribute.issuer.as_deref(),
                attribute.datatype,
            );
            if seen_keys.contains(&key) && !config.allow_attribute_duplicates {
                return Err(IndeterminateError::syntax_error(format!(
                    "duplicate Attribute '{}' (issuer {:?}) in category '{}'",
                    attribute.id, attribute.issuer, block.category
                )));
            }
            seen_keys.push(key);

            let mut values = Vec::with_capacity(attribute.values.len());
            for lexical in &attribute.values {
                values.push(
                    AttributeValue::parse(attribute.datatype, lexical).map_err(|e| {
                        e.context(format!(
                            "invalid value of attribute '{}' in category '{}'",
                            attribute.id, block.category
                        ))
                    })?,
                );
            }

            let fqn = AttributeFqn::new(
                block.category.as_str(),
                attribute.id.as_str(),
                attribute.issuer.as_deref(),
            );
            append(&mut named, fqn.clone(), attribute.datatype, &values)?;

            // Lax issuer mode: issued values are also visible under the
            // issuer-less name.
            if attribute.issuer.is_some() && !config.strict_attribute_issuer_match {
                append(&mut named, fqn.without_issuer(), attribute.datatype, &values)?;
            }
        }
    }

    let mut frozen: HashMap<AttributeFqn, Bag> = HashMap::with_capacity(named.len());
    for (fqn, (datatype, values)) in named {
        if values.len() > config.max_attribute_bag_size {
            return Err(IndeterminateError::processing_error(format!(
                "attribute {fqn} has {} values, exceeding the configured maximum of {}",
                values.len(),
                config.max_attribute_bag_size
            )));
        }
        let bag = Bag::new(datatype, values)
            .map_err(|e| IndeterminateError::processing_error(e.to_string()))?;
        frozen.insert(fqn, bag);
    }

    Ok(IndividualDecisionRequest::new(frozen, contents))
}

fn append(
    named: &mut HashMap<AttributeFqn, (Datatype, Vec<AttributeValue>)>,
    fqn: AttributeFqn,
    datatype: Datatype,
    values: &[AttributeValue],
) -> EvalResult<()> {
    match named.entry(fqn) {
        std::collections::hash_map::Entry::Vacant(slot) => {
            slot.insert((datatype, values.to_vec()));
        }
        std::collections::hash_map::Entry::Occupied(mut slot) => {
            let key = slot.key().clone();
            let (existing_datatype, existing) = slot.get_mut();
            if *existing_datatype != datatype {
                return Err(IndeterminateError::syntax_error(format!(
                    "attribute {} carries values of conflicting datatypes ({} and {})",
                    key,
                    existing_datatype.uri(),
                    datatype.uri()
                )));
            }
            existing.extend_from_slice(values);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use xacml_core::attribute::categories;
    use xacml_core::StatusCode;

    fn subject_block(attributes: Vec<RawAttribute>) -> RawCategory {
        RawCategory {
            category: categories::ACCESS_SUBJECT.into(),
            content: None,
            attributes,
        }
    }

    fn string_attr(id: &str, issuer: Option<&str>, values: &[&str]) -> RawAttribute {
        RawAttribute {
            id: id.into(),
            issuer: issuer.map(String::from),
            datatype: Datatype::String,
            values: values.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn repeated_category_is_syntax_error() {
        let request = RawRequest {
            categories: vec![subject_block(vec![]), subject_block(vec![])],
            return_policy_id_list: false,
        };
        let err = preprocess(&request, &PdpConfig::default()).unwrap_err();
        assert_eq!(err.status, StatusCode::SyntaxError);
    }

    #[test]
    fn duplicate_attributes_merge_in_lax_mode() {
        let request = RawRequest {
            categories: vec![subject_block(vec![
                string_attr("group", None, &["dev"]),
                string_attr("group", None, &["ops"]),
            ])],
            return_policy_id_list: false,
        };
        let idr = preprocess(&request, &PdpConfig::default()).unwrap();
        let fqn = AttributeFqn::new(categories::ACCESS_SUBJECT, "group", None::<&str>);
        assert_eq!(idr.attribute_bag(&fqn).unwrap().len(), 2);
    }

    #[test]
    fn duplicate_attributes_rejected_in_strict_mode() {
        let config = PdpConfig {
            allow_attribute_duplicates: false,
            ..Default::default()
        };
        let request = RawRequest {
            categories: vec![subject_block(vec![
                string_attr("group", None, &["dev"]),
                string_attr("group", None, &["ops"]),
            ])],
            return_policy_id_list: false,
        };
        let err = preprocess(&request, &config).unwrap_err();
        assert_eq!(err.status, StatusCode::SyntaxError);
    }

    #[test]
    fn lax_issuer_indexes_issued_values_without_issuer() {
        let request = RawRequest {
            categories: vec![subject_block(vec![string_attr(
                "role",
                Some("urn:example:issuer"),
                &["admin"],
            )])],
            return_policy_id_list: false,
        };
        let idr = preprocess(&request, &PdpConfig::default()).unwrap();

        let with_issuer = AttributeFqn::new(
            categories::ACCESS_SUBJECT,
            "role",
            Some("urn:example:issuer"),
        );
        let without_issuer = AttributeFqn::new(categories::ACCESS_SUBJECT, "role", None::<&str>);
        assert!(idr.attribute_bag(&with_issuer).is_some());
        assert!(idr.attribute_bag(&without_issuer).is_some());
    }

    #[test]
    fn strict_issuer_keeps_issued_values_issued_only() {
        let config = PdpConfig {
            strict_attribute_issuer_match: true,
            ..Default::default()
        };
        let request = RawRequest {
            categories: vec![subject_block(vec![string_attr(
                "role",
                Some("urn:example:issuer"),
                &["admin"],
            )])],
            return_policy_id_list: false,
        };
        let idr = preprocess(&request, &config).unwrap();
        let without_issuer = AttributeFqn::new(categories::ACCESS_SUBJECT, "role", None::<&str>);
        assert!(idr.attribute_bag(&without_issuer).is_none());
    }

    #[test]
    fn invalid_lexical_value_is_syntax_error() {
        let request = RawRequest {
            categories: vec![subject_block(vec![RawAttribute {
                id: "age".into(),
                issuer: None,
                datatype: Datatype::Integer,
                values: vec!["not-a-number".into()],
            }])],
            return_policy_id_list: false,
        };
        let err = preprocess(&request, &PdpConfig::default()).unwrap_err();
        assert_eq!(err.status, StatusCode::SyntaxError);
    }

    #[test]
    fn oversized_bag_is_processing_error() {
        let config = PdpConfig {
            max_attribute_bag_size: 2,
            ..Default::default()
        };
        let request = RawRequest {
            categories: vec![subject_block(vec![string_attr(
                "group",
                None,
                &["a", "b", "c"],
            )])],
            return_policy_id_list: false,
        };
        let err = preprocess(&request, &config).unwrap_err();
        assert_eq!(err.status, StatusCode::ProcessingError);
    }
}
