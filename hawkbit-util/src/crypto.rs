use sha2::{Digest as _, Sha256};

pub fn sha256_hex_digest<D: AsRef<[u8]>>(data: D) -> String {
    let mut hasher = Sha256Hasher::default();
    hasher.update(data);
    hasher.finish()
}

/// Incremental SHA-256 for data that arrives in chunks, e.g. a download stream.
#[derive(Default)]
pub struct Sha256Hasher(Sha256);

impl Sha256Hasher {
    pub fn update<D: AsRef<[u8]>>(&mut self, data: D) {
        self.0.update(data.as_ref());
    }

    /// Consume the hasher returning the lowercase hex digest
    pub fn finish(self) -> String {
        let digest = self.0.finalize();
        format!("{digest:x}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex_digest() {
        assert_eq!(
            sha256_hex_digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_incremental_digest_matches_one_shot() {
        let mut hasher = Sha256Hasher::default();
        hasher.update("hello ");
        hasher.update(b"world");

        assert_eq!(hasher.finish(), sha256_hex_digest("hello world"));
    }
}
