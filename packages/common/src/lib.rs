pub mod error;
pub mod filesystem;
pub mod ids;
pub mod kinds;
pub mod models;
pub mod path;
pub mod record;
pub mod result;

pub use error::*;
pub use filesystem::*;
pub use ids::*;
pub use kinds::*;
pub use path::*;
pub use record::*;
pub use result::*;
