// Application tracking: a per-user pipeline of roles applied to.

pub mod handlers;
pub mod repository;
pub mod status;
