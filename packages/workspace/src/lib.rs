pub mod file_gateway;
pub mod leads;
pub mod server;
pub mod state;

pub use file_gateway::FileGateway;
pub use leads::LeadBoard;
pub use server::{router, serve, ApiError, AppState};
pub use state::{ConsoleState, Overview, StateError};
