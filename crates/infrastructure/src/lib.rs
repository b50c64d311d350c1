pub mod dynamodb;
pub mod local_cache;
pub mod memory;
pub mod models;
pub mod repositories;

pub use dynamodb::*;
pub use local_cache::*;
pub use memory::*;
pub use models::*;
pub use repositories::*;
