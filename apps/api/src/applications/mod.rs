// Job applications: public submission plus owner-scoped management.

pub mod handlers;
pub mod records;
