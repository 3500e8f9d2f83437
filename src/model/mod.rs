mod cache;
mod config;
mod entities;
mod error;
mod request;
mod response;

pub use cache::*;
pub use config::*;
pub use entities::*;
pub use error::*;
pub use request::*;
pub use response::*;
