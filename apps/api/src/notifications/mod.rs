// Notifications: persisted user notifications plus real-time delivery over
// WebSocket. `ConnectionHub` holds local sockets; `NotificationService` stores,
// pushes, and fans out across instances via redis.

pub mod handlers;
pub mod hub;
pub mod messages;
pub mod repository;
pub mod service;
pub mod ws;

pub use hub::ConnectionHub;
pub use service::NotificationService;
