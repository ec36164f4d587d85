//! Regular-expression match functions.
//!
//! XACML regexp-match semantics follow XPath `fn:matches`: the pattern
//! matches anywhere in the value (unanchored). A pattern that fails to
//! compile is a processing error. Compiled patterns are cached in a
//! thread-local LRU, since policies evaluate the same constant patterns for
//! every request.

use std::cell::RefCell;
use std::num::NonZeroUsize;

use regex::Regex;
use xacml_core::{AttributeValue, Datatype, EvalResult, IndeterminateError, Value};

use super::{as_prim, as_str, eager, urn};
use crate::function::FunctionRegistry;

thread_local! {
    static REGEX_CACHE: RefCell<lru::LruCache<String, Regex>> =
        RefCell::new(lru::LruCache::new(NonZeroUsize::new(64).unwrap()));
}

/// Compiles (or fetches) a pattern. Regex::clone is cheap (Arc internally).
fn compiled(pattern: &str) -> EvalResult<Regex> {
    let cached = REGEX_CACHE.with(|cache| cache.borrow_mut().get(pattern).cloned());
    if let Some(re) = cached {
        return Ok(re);
    }
    let re = Regex::new(pattern).map_err(|e| {
        IndeterminateError::processing_error(format!("invalid regular expression {pattern:?}: {e}"))
    })?;
    REGEX_CACHE.with(|cache| {
        cache.borrow_mut().put(pattern.to_string(), re.clone());
    });
    Ok(re)
}

/// The datatypes with a 2.0 regexp-match function; the value's canonical
/// lexical form is what the pattern is matched against.
const MATCHABLE: [Datatype; 5] = [
    Datatype::AnyUri,
    Datatype::IpAddress,
    Datatype::DnsName,
    Datatype::Rfc822Name,
    Datatype::X500Name,
];

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register(eager(
        urn("1.0", "string-regexp-match"),
        vec![Datatype::String.into(), Datatype::String.into()],
        Datatype::Boolean.into(),
        |args| {
            let re = compiled(as_str(&args[0])?)?;
            Ok(re.is_match(as_str(&args[1])?).into())
        },
    ));

    for dt in MATCHABLE {
        registry.register(eager(
            urn("2.0", format_args!("{}-regexp-match", dt.function_name())),
            vec![Datatype::String.into(), dt.into()],
            Datatype::Boolean.into(),
            |args| {
                let re = compiled(as_str(&args[0])?)?;
                Ok(re.is_match(&as_prim(&args[1])?.canonical()).into())
            },
        ));
    }
}
