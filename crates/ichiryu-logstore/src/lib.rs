//! Append-only, per-day channel logs for ichiryu.
//!
//! Each channel writes to `{YYYY-MM-DD}-{channel}.log` under the log root.
//! Every line is flushed before `append` returns, and the open file is
//! swapped when the local date changes between two writes.

mod log_store;

pub use log_store::{log_file_name, LogStore};
