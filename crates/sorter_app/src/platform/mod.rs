mod app;
pub mod config;
mod effects;
mod prompt;

pub use app::run;
