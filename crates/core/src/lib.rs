pub mod constants;
pub mod encoding;
pub mod error;
pub mod logger;
pub mod types;
pub mod units;
pub mod user_operation;

pub use error::CoreError;
pub use types::{Call, Chain};
pub use user_operation::{PackedUserOperation, UserOperation, UserOperationV07};
