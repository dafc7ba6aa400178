//! Flow runner
//!
//! Reads YAML flow files and executes their tests against a
//! [`RunContext`](crate::RunContext). Assertions are made against parsed
//! response bodies rather than raw text.

mod config;
mod report;
mod runner;
mod select;
mod template;

pub use config::*;
pub use report::{RunReport, TestResult, TestStatus};
pub use runner::{load_flow, run_targets, RunOptions};
pub use select::{parse_target, resolve_targets, Selection};
pub use template::{render_str, render_value, TemplateScope};
