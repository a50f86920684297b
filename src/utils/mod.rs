//! The `utils` module provides the pieces shared by every other module:
//! error types, logging setup and the diagnostics hook used to observe
//! failures that are otherwise absorbed silently.

pub mod diagnostics;
pub mod error;
pub mod logging;

pub use diagnostics::{Diagnostic, Diagnostics, TracingDiagnostics};
pub use error::{FrameError, HandshakeError, TransportError};

#[cfg(test)]
mod tests;
