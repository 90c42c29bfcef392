// Declare all modules as public so they can be used by embedding frontends and tests.
pub mod config;
pub mod core;
pub mod utils;
