//! Delta decoding - flattening frames into ordered delta records

mod client_payload;
mod decoder;

pub use client_payload::decode_client_payload;
pub use decoder::{Decoded, DeltaDecoder, DeltaRecord};
