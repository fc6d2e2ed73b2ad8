pub mod config;
pub mod crawl;
pub mod data;
pub mod error;
pub mod report;

pub use error::{CoreError, Result};

use colored::Colorize;

pub fn print_banner() {
    println!(
        "{} {}",
        "areacrawl".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("{}\n", "administrative area crawler".dimmed());
}
