// Allow unwrap in testing utilities - test code should panic on errors
#![allow(clippy::unwrap_used)]

//! # QuestFlow Testing Utilities
//!
//! Configurable mock adapters for every port in
//! [`questflow_core::ports`], for exercising [`questflow_workflows`]
//! pipelines without real vendor clients.
//!
//! ```rust,ignore
//! use questflow_testing::MockLlmPort;
//!
//! let llm = MockLlmPort::new().with_handler(|_req| {
//!     Ok(questflow_core::ports::LlmResponse::Text("ok".to_string()))
//! });
//! ```

mod mock_ports;

pub use mock_ports::{
    MockCrawlerPort, MockDeepResearchPort, MockGraphPort, MockImageGeneratePort, MockLlmPort, MockNewsSearchPort,
    MockStorePort, MockUrlValidatePort,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        MockCrawlerPort, MockDeepResearchPort, MockGraphPort, MockImageGeneratePort, MockLlmPort, MockNewsSearchPort,
        MockStorePort, MockUrlValidatePort,
    };
}
