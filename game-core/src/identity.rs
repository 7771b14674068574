use game_types::{PlayerId, RoomCode};
use rand::Rng;
use std::fmt::Write;
use uuid::Uuid;

const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const ROOM_CODE_LENGTH: usize = 6;
const TOKEN_BYTES: usize = 32;

/// Short human-typable code. Ambiguous glyphs (0/O, 1/I) are excluded.
pub fn generate_room_code<R: Rng>(rng: &mut R) -> RoomCode {
    (0..ROOM_CODE_LENGTH)
        .map(|_| ROOM_CODE_ALPHABET[rng.random_range(0..ROOM_CODE_ALPHABET.len())] as char)
        .collect()
}

pub fn generate_player_id() -> PlayerId {
    Uuid::new_v4().simple().to_string()
}

pub fn generate_token<R: Rng>(rng: &mut R) -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rng.fill(&mut bytes);
    bytes.iter().fold(String::with_capacity(TOKEN_BYTES * 2), |mut out, b| {
        let _ = write!(out, "{:02x}", b);
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_room_code_uses_unambiguous_alphabet() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..200 {
            let code = generate_room_code(&mut rng);
            assert_eq!(code.len(), ROOM_CODE_LENGTH);
            assert!(code.bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_player_id_is_32_hex_chars() {
        let id = generate_player_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, generate_player_id());
    }

    #[test]
    fn test_token_is_64_hex_chars() {
        let mut rng = rand::rng();
        let token = generate_token(&mut rng);
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token(&mut rng));
    }
}
