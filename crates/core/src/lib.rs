pub mod errors;
pub mod events;
pub mod models;

pub use errors::*;
pub use events::*;
pub use models::*;
