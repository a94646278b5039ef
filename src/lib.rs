// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod backend;
pub mod clock;
pub mod config;
pub mod keystrokes;
pub mod monitor;
pub mod notify;
pub mod policy;
pub mod recorder;
pub mod runtime;
pub mod scheduler;
pub mod scoring;
pub mod session;
pub mod store;
pub mod time_series;
pub mod ui;
pub mod util;
