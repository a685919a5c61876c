pub mod app;
pub mod commands;
pub mod conditions;
pub mod console;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod output;
pub mod run;
pub mod runtime;
pub mod timings;
pub mod validate;

pub use console::ConsoleOperator;
pub use context::CliContext;
