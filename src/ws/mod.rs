//! WebSocket layer: connection handling, message routing, subscriptions.
//!
//! The WebSocket endpoint at `/ws` carries the realtime session protocol:
//! join/leave for viewer membership, chat and tips, plus raw topic
//! subscriptions for token trading channels.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
