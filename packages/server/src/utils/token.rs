use rand::Rng;

/// Length of a team invite token.
pub const INVITE_TOKEN_LEN: usize = 12;

/// Random invite token: 12 uppercase hex characters.
pub fn invite_token() -> String {
    let bytes: [u8; INVITE_TOKEN_LEN / 2] = rand::rng().random();
    hex::encode_upper(bytes)
}

/// Canonical form of a user-typed invite token.
pub fn normalize_invite_token(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}
