//! Request/response DTOs for the REST API.

pub mod common_dto;
pub mod session_dto;
pub mod token_dto;

pub use common_dto::{PaginationMeta, PaginationParams};
pub use session_dto::{
    ChatHistoryResponse, ChatMessageDto, CreateSessionRequest, SessionListResponse,
    SessionResponse,
};
pub use token_dto::{
    EvaluateGraduationResponse, LaunchTokenRequest, LiquidityPoolDto, MarketCapRequest,
    TokenListResponse, TokenResponse,
};
