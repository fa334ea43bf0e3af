//! Random secrets and constant-time comparison

use rand::{Rng, distributions::Alphanumeric, rngs::OsRng};
use subtle::ConstantTimeEq;

/// Length of session identifiers and CSRF tokens, in characters.
///
/// 64 alphanumeric characters carry roughly 380 bits of entropy.
pub const TOKEN_LENGTH: usize = 64;

/// Draw an alphanumeric secret from the operating system RNG
pub fn random_token(len: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Compare two secrets without an early exit on the first differing byte
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
