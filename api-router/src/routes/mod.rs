pub mod health;
pub mod liveness;
pub mod query;
