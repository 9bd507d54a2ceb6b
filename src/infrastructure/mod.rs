//! Infrastructure layer - External service implementations

pub mod codec;
pub mod logging;
pub mod services;
pub mod storage;
