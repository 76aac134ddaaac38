//! Presentation layers of the CLI. Both only talk to a [`GenerateText`] implementation.
//!
//! [`GenerateText`]: crate::controller::GenerateText

pub mod form;
pub mod repl;
