//! Database module for the PostgreSQL create-lock store.

mod pool;

pub use pool::*;
