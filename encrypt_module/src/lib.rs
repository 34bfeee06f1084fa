mod encrypt;

pub use encrypt::{url_safe, EncryptError, EncryptOptions, Encryptor};
