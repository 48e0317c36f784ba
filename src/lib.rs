mod app;
pub mod clients;
pub mod commands;
pub mod config;
pub mod confirm;
pub mod error;
pub mod history;
pub mod prompt;
pub mod ui;
pub mod undo;

#[cfg(test)]
mod testing;

// Re-export App and Config from modules
pub use app::App;
pub use app::ORIGIN;
pub use config::Config;

// Disable colors for all tests to get clean output
#[cfg(test)]
#[ctor::ctor]
fn init_tests() {
    colored::control::set_override(false);
}
