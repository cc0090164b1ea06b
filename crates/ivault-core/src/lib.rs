pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use error::{IvaultError, IvaultResult};
pub use types::ChunkingParams;

/// Generated record types (from ivault.proto)
pub mod proto {
    include!(concat!(env!("OUT_DIR"), "/ivault.rs"));
}
