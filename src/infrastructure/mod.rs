mod cache_memory;
mod client_cached;
mod client_paginated;
mod clock_system;
mod collector_releases;
mod config_loader_yaml;
mod config_reloader;
mod fetcher_rest;
mod server_http;
mod shutdown_signal;

pub use cache_memory::*;
pub use client_cached::*;
pub use client_paginated::*;
pub use clock_system::*;
pub use collector_releases::*;
pub use config_loader_yaml::*;
pub use config_reloader::*;
pub use fetcher_rest::*;
pub use server_http::*;
pub use shutdown_signal::*;
