//! EtherDAW CLI library.
//!
//! Score loading, logging setup, and the command implementations behind the
//! `etherdaw` binary.

pub mod commands;
pub mod input;
pub mod logging;
