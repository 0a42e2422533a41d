pub mod auth;
pub mod staff;

pub use auth::{auth_middleware, CurrentUser};
pub use staff::staff_middleware;
