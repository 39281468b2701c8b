//! Subcommand implementations.

pub mod article;
pub mod company;
