//! Random text for credentials and content.

use rand::Rng;

/// Lowercase letters and digits. Used for usernames, passwords and titles.
pub const LOWER_ALNUM: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Every printable ASCII character plus whitespace. Used for post bodies.
pub const PRINTABLE: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~ \t\n\r\x0b\x0c";

/// Length of generated usernames, passwords and email parts.
pub const CREDENTIAL_LEN: usize = 8;

/// Length of generated post titles.
pub const TITLE_LEN: usize = 30;

/// Length of generated post bodies.
pub const BODY_LEN: usize = 1024;

/// `len` characters drawn uniformly from `alphabet`.
pub fn random_text<R: Rng + ?Sized>(rng: &mut R, len: usize, alphabet: &[u8]) -> String {
    (0..len)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}

/// A lowercase alphanumeric credential of [`CREDENTIAL_LEN`] characters.
pub fn random_credential<R: Rng + ?Sized>(rng: &mut R) -> String {
    random_text(rng, CREDENTIAL_LEN, LOWER_ALNUM)
}
