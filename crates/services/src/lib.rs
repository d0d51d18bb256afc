#![forbid(unsafe_code)]

pub mod error;
pub mod http;
pub mod maintenance;
pub mod mistakes;
pub mod remote;
pub mod sessions;

pub use practice_core::time::Clock;

pub use error::RemoteError;
pub use http::{HttpPracticeClient, RemoteConfig};
pub use maintenance::HistorySweeper;
pub use mistakes::{MistakeRecorder, SessionTokenProvider};
pub use remote::{
    AnalyticsSink, MistakeApi, MistakeReport, PracticeAnalytics, SessionSaveApi,
    SessionSavePayload,
};
pub use sessions::{
    EngineDeps, EngineOptions, SessionContext, SessionEngine, SessionProgress, SessionTimer,
};
