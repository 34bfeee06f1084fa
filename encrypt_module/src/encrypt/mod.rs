mod constants;
mod errors;
mod openssl;
mod utils;

pub use errors::EncryptError;
pub use openssl::{url_safe, EncryptOptions, Encryptor};
