//! Internal utility helpers.

mod env;

pub use env::get_env_with_prefix;
