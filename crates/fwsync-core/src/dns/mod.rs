//! DNS answer handling
//!
//! - [`AnswerRecord`]: The record kinds the resolver cares about
//! - [`resolve`]: Alias-chain resolution over an answer section

pub mod record;
pub mod resolver;

pub use record::{AnswerRecord, answer_records};
pub use resolver::resolve;
