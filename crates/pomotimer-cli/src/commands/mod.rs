pub mod completions;
pub mod config;
pub mod next;
pub mod run;
