//! Image fingerprinting for the sequencer's duplicate guard.

/// Hash of `(seed, prompt, reference_image_url)`, used to refuse emitting
/// two images with an identical fingerprint within one sequencer run.
pub fn image_fingerprint(seed: u64, prompt: &str, reference_url: Option<&str>) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&seed.to_le_bytes());
    hasher.update(b"\0");
    hasher.update(prompt.as_bytes());
    hasher.update(b"\0");
    hasher.update(reference_url.unwrap_or("").as_bytes());
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn differs_on_seed() {
        let a = image_fingerprint(1, "a warm hero image", Some("https://img/1.png"));
        let b = image_fingerprint(2, "a warm hero image", Some("https://img/1.png"));
        assert_ne!(a, b);
    }

    #[test]
    fn deterministic_for_same_inputs() {
        let a = image_fingerprint(7, "featured image", None);
        let b = image_fingerprint(7, "featured image", None);
        assert_eq!(a, b);
    }
}
