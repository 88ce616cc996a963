// Job alerts: saved searches that turn new postings into notifications.

pub mod handlers;
pub mod matcher;
pub mod repository;
