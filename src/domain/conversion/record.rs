//! Element types that can be stored in a data source

use serde::{Serialize, de::DeserializeOwned};

/// A value type that can be held by a [`DataSource`](super::DataSource)
///
/// `ELEMENT_TYPE` is the tag persisted next to the records. It must be stable
/// across builds and unique per record shape, e.g.:
///
/// ```
/// use conversion_store::domain::conversion::SourceRecord;
///
/// #[derive(serde::Serialize, serde::Deserialize)]
/// struct CustomerRow {
///     id: u64,
///     email: String,
/// }
///
/// impl SourceRecord for CustomerRow {
///     const ELEMENT_TYPE: &'static str = "customer-row";
/// }
/// ```
pub trait SourceRecord: Serialize + DeserializeOwned + Send + Sync + 'static {
    const ELEMENT_TYPE: &'static str;
}

macro_rules! source_records {
    ($($ty:ty => $tag:literal),* $(,)?) => {
        $(
            impl SourceRecord for $ty {
                const ELEMENT_TYPE: &'static str = $tag;
            }
        )*
    };
}

source_records! {
    String => "string",
    bool => "boolean",
    i32 => "int32",
    i64 => "int64",
    u32 => "uint32",
    u64 => "uint64",
    f64 => "double",
    serde_json::Value => "json",
}
