// Accounts: the record side of a user. Credentials live with the identity gateway.

pub mod accounts;
pub mod handlers;
