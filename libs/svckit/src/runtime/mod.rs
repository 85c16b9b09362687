mod runner;

pub use runner::{check, run, RunOptions, ShutdownOptions};
