//! Image inputs: upload validation, decoding, decode bookkeeping and the template catalog.

pub mod catalog;
pub mod data_url;
pub mod decode;
pub mod slot;
