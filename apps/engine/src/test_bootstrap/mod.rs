//! Test-only bootstrap helpers (logging initialization).

pub mod logging;
