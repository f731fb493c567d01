//! Common test utilities for nessus-export integration tests

#[allow(dead_code)]
pub mod assertions;
#[allow(dead_code)]
pub mod scanner;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use scanner::*;
