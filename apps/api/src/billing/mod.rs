// Subscription billing.
// All payment-processor calls go through `gateway::StripeClient`.

pub mod gateway;
pub mod handlers;
pub mod payments;
pub mod pricing;
