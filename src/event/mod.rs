//! Inbound event decoding and matching.

mod matcher;
mod message;

pub use matcher::EventMatcher;
pub use message::{DecodedEvent, ElementStateEvent, Payload, RawEvent, StateChangeEvent};
