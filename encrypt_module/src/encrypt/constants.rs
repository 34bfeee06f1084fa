pub(super) const DEFAULT_OPENSSL_BIN: &str = "openssl";
pub(super) const DEFAULT_ENCRYPT_TIMEOUT_SECS: u64 = 10;

pub(super) const OPENSSL_CIPHER: &str = "-aes-128-cbc";

/// IrssiNotifier clients strip one trailing character after decrypting.
pub(super) const PLAINTEXT_SUFFIX: &str = " ";

/// Header `openssl enc -salt` writes ahead of the 8-byte salt.
pub(super) const SALTED_MAGIC: &[u8] = b"Salted__";
pub(super) const SALT_LEN: usize = 8;

pub(super) const OUTPUT_TAIL_LEN: usize = 2000;
