//! Infrastructure error mapping

mod conversions;

pub use conversions::IntoStoreError;
