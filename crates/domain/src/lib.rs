pub mod errors;
pub mod input;
pub mod todo;
pub mod user;

pub use errors::*;
pub use input::*;
pub use todo::*;
pub use user::*;
