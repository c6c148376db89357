#[macro_use]
extern crate serde_derive;

mod address;
mod cache;
mod config;
mod debounce;
mod error;
mod fetch;
mod format;
mod search_field;

pub use address::*;
pub use cache::*;
pub use config::*;
pub use debounce::*;
pub use error::*;
pub use fetch::*;
pub use format::*;
pub use search_field::*;
