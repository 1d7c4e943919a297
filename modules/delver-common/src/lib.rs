pub mod cancel;
pub mod config;
pub mod error;
pub mod rate;
pub mod types;

pub use cancel::CancelToken;
pub use config::Config;
pub use error::DelverError;
pub use rate::RateGate;
pub use types::*;
