use crate::core::types::TransactionId;

pub trait FromRandom {
    fn from_random() -> Self;
}

impl FromRandom for TransactionId {
    fn from_random() -> Self {
        TransactionId(random_string(8))
    }
}

pub fn random_string(size: usize) -> String {
    use rand::Rng;

    rand::thread_rng()
        .sample_iter(rand::distributions::Alphanumeric)
        .take(size)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_string_is_alphanumeric() {
        let s = random_string(32);
        assert_eq!(s.len(), 32);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn transaction_ids_differ() {
        assert_ne!(TransactionId::from_random(), TransactionId::from_random());
    }
}
