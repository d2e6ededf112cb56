pub mod analyzers;
pub mod config;
pub mod loc;
pub mod pbar;
pub mod reporters;
pub mod runner;
pub mod scm;
pub mod types;

pub use runner::{CommandError, CommandRunner, SystemRunner};
pub use scm::{get_log, LogCollector, ProgressSink};
pub use types::LogEntry;
