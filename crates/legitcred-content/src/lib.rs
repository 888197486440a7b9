//! Content-addressed document retrieval for credential metadata.

pub mod error;
pub mod gateway;
pub mod memory;
pub mod traits;

pub use error::ResolutionError;
pub use gateway::{GatewayConfig, GatewayResolver};
pub use memory::MemoryResolver;
pub use traits::ContentResolver;
