//! Messaging backend adapters

pub mod console;
pub mod harness;

pub use console::ConsoleAdapter;
pub use harness::HarnessAdapter;
