//! CLI commands

mod export;

pub use export::ExportCommand;
