pub mod context;
pub mod error;
pub mod service;

pub use context::AppContext;
pub use error::{ExtractError, Phase, PhaseExt, Result, RednoteError};
pub use service::XhsService;
