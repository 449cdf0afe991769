//! Filesystem helpers shared by the ichiryu crates.

pub mod atomic_io;

pub use atomic_io::{write_bytes_atomic, write_text_atomic};
