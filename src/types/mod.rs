//! Wire and conversation types.

pub mod labs_request;
pub mod labs_response;
pub mod model;
pub mod turn;

pub use labs_request::{LABS_PROTOCOL_VERSION, LABS_SOURCE, LABS_TIMEZONE, LabsRequest};
pub use labs_response::{LabsResponse, STATUS_COMPLETED};
pub use model::{KnownModel, Model};
pub use turn::{Turn, TurnRole};
