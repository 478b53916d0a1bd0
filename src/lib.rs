//! omnichat library — the context-assembly and augmentation pipeline behind
//! the CLI, exposed for integration tests.

pub mod augment;
pub mod config;
pub mod errors;
pub mod i18n;
pub mod persona;
pub mod pipeline;
pub mod prompt;
pub mod providers;
pub mod repl;
pub mod session;
pub mod speech;
pub mod stream;
pub mod vision;
