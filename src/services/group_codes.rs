use rand::Rng;
use sqlx::PgPool;

use crate::repositories;

// Ambiguous glyphs (I, O, 0, 1) are left out of join codes.
const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LEN: usize = 6;

pub(crate) fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    let mut output = String::with_capacity(CODE_LEN);
    for _ in 0..CODE_LEN {
        let index = rng.gen_range(0..ALPHABET.len());
        output.push(ALPHABET[index] as char);
    }
    output
}

/// Draws codes until one is unused. Collisions are rare at 32^6 codes, so
/// the loop almost always exits on the first draw.
pub(crate) async fn generate_unique_code(pool: &PgPool) -> Result<String, sqlx::Error> {
    loop {
        let code = generate_code();
        if !repositories::groups::exists_code(pool, &code).await? {
            return Ok(code);
        }
    }
}
