pub mod composer;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod error_utils;
pub mod filter;
pub mod ports;
pub mod seen;
pub mod types;

pub use composer::*;
pub use config::*;
pub use dispatch::*;
pub use error::*;
pub use error_utils::*;
pub use filter::*;
pub use ports::*;
pub use seen::*;
pub use types::*;
