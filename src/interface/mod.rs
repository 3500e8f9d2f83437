mod cache;
mod client;
mod clock;
mod collector;
mod config_loader;
mod fetcher;

pub use cache::*;
pub use client::*;
pub use clock::*;
pub use collector::*;
pub use config_loader::*;
pub use fetcher::*;
