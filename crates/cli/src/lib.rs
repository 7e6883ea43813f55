//! Command-line front end for the `uia` library.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
pub mod selector_args;
pub mod styles;
