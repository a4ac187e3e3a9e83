//! # encore-gateway
//!
//! REST API and WebSocket gateway for the Encore creator platform's two
//! realtime flows: livestream sessions (viewer membership, chat, tips) and
//! the artist-token graduation workflow (bonding-curve token → liquidity
//! pool). Bonding-curve pricing, payment verification, and on-chain pool
//! creation are external — this service is a coordination layer.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── SessionService (service/)
//!     ├── GraduationService (service/)
//!     ├── EventBus (domain/)
//!     │
//!     └── StreamStore (persistence/)
//!         ├── MemoryStore
//!         └── PostgresStore
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod ws;
