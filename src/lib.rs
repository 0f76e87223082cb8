pub mod signature;
pub mod crypto;
pub mod bsii;
pub mod text;
pub mod pipeline;

pub use signature::Signature;
pub use text::{Block, Document};
pub use pipeline::{decode_to_text, load_file, read_document, save_file, write_document, SiiError};
