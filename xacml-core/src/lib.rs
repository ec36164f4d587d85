//! # XACML Core
//!
//! Core data model for the XACML 3.0 Policy Decision Point:
//!
//! - Attribute values for the 16 standard datatypes, and immutable bags
//! - Temporal types with XSD lexical round-trip and instant comparison
//! - Attribute FQNs (category / id / issuer) and frozen decision requests
//! - Status codes, the `Indeterminate` error carried through evaluation,
//!   and the fatal load-time error type
//! - The decision model: `Decision`, `Indeterminate` flavors,
//!   `ExtendedDecision`, `DecisionResult`, PEP actions
//! - Policy versions and version-match patterns
//!
//! ## Design Principles
//!
//! 1. **Immutable after load**: policies and values never change once built;
//!    concurrent readers need no locks
//! 2. **Errors are values**: evaluation-time failures travel as
//!    `IndeterminateError` in `Result`, never as panics
//! 3. **Lexical round-trip**: every primitive keeps a canonical string form
//!    so `T-from-string(string-from-T(v)) == v`

pub mod attribute;
pub mod bag;
pub mod datatype;
pub mod decision;
pub mod error;
pub mod names;
pub mod request;
pub mod temporal;
pub mod value;
pub mod version;

pub use attribute::{AttributeFqn, categories};
pub use bag::Bag;
pub use datatype::{Datatype, DatatypeId};
pub use decision::{
    AttributeAssignment, Decision, DecisionResult, Effect, ExtendedDecision, IndeterminateFlavor,
    PepAction, PolicyIdent,
};
pub use error::{EvalResult, IndeterminateError, PdpError, Result, StatusCode};
pub use names::{DnsName, IpAddress, PortRange, Rfc822Name, X500Name};
pub use request::IndividualDecisionRequest;
pub use temporal::{Date, DateTime, DayTimeDuration, Time, YearMonthDuration};
pub use value::{AttributeValue, Value};
pub use version::{PolicyVersion, VersionPattern, VersionPatterns};
