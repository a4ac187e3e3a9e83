//! Domain layer: identifiers, session/token records, and the event system.
//!
//! This module contains the server-side domain model: typed identifiers,
//! livestream session and chat records, artist tokens with their liquidity
//! pools, and the event bus that broadcasts state changes to WebSocket
//! subscribers.

pub mod chat;
pub mod event;
pub mod event_bus;
pub mod identity;
pub mod ids;
pub mod session;
pub mod token;

pub use chat::ChatMessage;
pub use event::StreamEvent;
pub use event_bus::EventBus;
pub use identity::CallerIdentity;
pub use ids::{PoolId, SessionId, TokenId, UserId};
pub use session::{LivestreamSession, SessionStatus};
pub use token::{ArtistToken, LiquidityPool};
