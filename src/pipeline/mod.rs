//! The request pipeline: query processing, response generation and the
//! two-sided safety gate.

pub mod generate;
pub mod query;
pub mod safety;

pub use generate::ResponseGenerator;
pub use query::{ProcessedQuery, QueryProcessor};
pub use safety::{SafetyValidator, ValidationResult};
