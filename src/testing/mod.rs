//! Test support: mock transport and event injection

pub mod mocks;

pub use mocks::{EventInjector, MockTransport};
