//! Core value types shared across the crate.

pub mod stop;
pub mod time;

pub use stop::StopIteration;
pub use time::Time;
