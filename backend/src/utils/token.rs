use rand::{Rng, distributions::Alphanumeric};

/// Length of generated email-verification tokens.
pub const VERIFICATION_TOKEN_LENGTH: usize = 32;

/// Generates a random alphanumeric token of the given length.
///
/// Backed by the thread-local CSPRNG, so the result is unguessable and
/// suitable for verification links.
pub fn generate_token(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_tokens_of_requested_length() {
        assert_eq!(generate_token(VERIFICATION_TOKEN_LENGTH).len(), 32);
        assert_eq!(generate_token(8).len(), 8);
    }

    #[test]
    fn tokens_are_alphanumeric_and_distinct() {
        let a = generate_token(32);
        let b = generate_token(32);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
