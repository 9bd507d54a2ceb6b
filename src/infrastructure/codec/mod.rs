//! Document codec implementations

mod factory;
mod json;
mod xml;

pub use factory::CodecFactory;
pub use json::JsonDocumentCodec;
pub use xml::XmlDocumentCodec;
