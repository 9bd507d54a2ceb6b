//! Infrastructure services

mod conversion_store;

pub use conversion_store::ConversionStore;
