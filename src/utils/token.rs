use rand::{distributions::Alphanumeric, thread_rng, Rng};

/// Opaque session handle for clients. Generated randomly so session rows
/// cannot be enumerated through their sequential ids.
pub fn generate_session_token(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
