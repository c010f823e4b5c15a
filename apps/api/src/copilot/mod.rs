// Copilot configuration wizard.
// Four-step configuration records per user, with forward-only step progress.

pub mod handlers;
pub mod steps;
pub mod store;
pub mod wizard;
