pub mod application;
pub mod copilot;
pub mod payment;
pub mod user;
