pub mod context;
pub mod drop;
pub mod login;
pub mod status;
