//! Message types for the supported LLM protocols.
//!
//! Each vendor module holds the wire format of one API. The [`unified`] module holds
//! the protocol-agnostic representation and all conversions between the two.

pub mod anthropic;
pub mod google;
pub mod openai;
pub mod unified;
