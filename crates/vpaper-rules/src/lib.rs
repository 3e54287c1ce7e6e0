//! # vpaper-rules
//!
//! Rule matching and action engine for virtualpaper documents.
//!
//! A [`DocumentRule`] binds a [`Rule`](vpaper_core::Rule) to a document. Its
//! conditions are evaluated in order, combined by the rule mode, and on a
//! match the rule's actions mutate the document in place. Text conditions
//! tolerate typos ([`typo`]), date conditions extract dates from free text
//! ([`dates`]). The engine is synchronous and performs no I/O.

pub mod actions;
pub mod conditions;
pub mod dates;
pub mod metadata;
pub mod rule;
pub mod trace;
pub mod typo;

pub use dates::{extract_date, parse_date};
pub use metadata::{document_matches_filter, match_metadata};
pub use rule::{match_test, ConditionResult, DocumentRule, RuleTestResult};
pub use trace::{Trace, TraceLevel, TraceLine};
pub use typo::{match_text_allow_typo, max_typos};
