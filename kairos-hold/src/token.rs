use rand::rngs::OsRng;
use rand::Rng;

const TOKEN_LEN: usize = 48;
const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Opaque hold token: 48 characters over a 62-symbol alphabet drawn from
/// the OS entropy source, never derived from slot parameters. Usable in a
/// URL path segment without encoding.
pub fn generate_token() -> String {
    let mut rng = OsRng;
    (0..TOKEN_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}
