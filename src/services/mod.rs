//! The overlap resolution engine.
//!
//! Three pieces, in dependency order: the midnight classifier, the
//! scan-line overlap arithmetic, and the resolver that walks a satellite's
//! ordered orbit sequence and writes the derived windows back through the
//! catalog traits.

pub mod midnight;
pub mod overlap;
pub mod resolver;

pub use resolver::{resolve_all, resolve_satellite, RunReport, RunSummary};

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod resolver_tests;
