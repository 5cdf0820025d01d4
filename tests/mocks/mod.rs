//! Shared fixtures and stub servers for integration tests

pub mod fixtures;
pub mod stub_provider;

#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use stub_provider::{RecordedRequest, StubProvider, StubReply};
