// src/exec/mod.rs

//! Remote execution layer.
//!
//! - [`transport`] turns one (server, command) unit into an OS process
//!   description. [`SshTransport`] is what production uses; tests swap in a
//!   local shell.
//! - [`dispatcher`] starts every unit at once, wires its output streams to
//!   artifact files and records exit codes.

pub mod dispatcher;
pub mod transport;

pub use dispatcher::{dispatch, DispatchReport, UnitExit};
pub use transport::{SshTransport, Transport};
