//! Structural classifier for "could this text be our encoded ciphertext?"
//!
//! No metadata records which directory entries are encrypted, so listing has
//! to decide per entry from shape alone. A name produced by this system is the
//! base64url spelling of `salt(8) || body(16k)` bytes, and only those byte
//! lengths survive the base64 expansion with the residues checked here.
//!
//! This is a heuristic. A coincidentally shaped plaintext name will classify
//! as ciphertext (callers follow up with a real decrypt attempt and treat its
//! failure accordingly), but output of our own cipher+codec never classifies
//! as plaintext.

use super::cipher::{BLOCK_LEN, SALT_LEN};

/// Encoded length of the smallest possible ciphertext (salt + one block).
const MIN_ENCODED_LEN: usize = (SALT_LEN + BLOCK_LEN) * 4 / 3;

const PAD: u8 = b'=';

fn in_alphabet(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_'
}

/// Whether `candidate` is shaped like codec-encoded ciphertext.
///
/// `candidate` must be a whole run: alphabet characters with up to two
/// trailing pads and nothing else. Unpadded spellings are accepted too; the
/// pad count they would have carried is reconstructed from `len % 4`.
pub fn is_ciphertext_shaped(candidate: &str) -> bool {
    let bytes = candidate.as_bytes();
    let pads = bytes.iter().rev().take_while(|&&b| b == PAD).count();
    if pads > 2 {
        return false;
    }
    let run = &bytes[..bytes.len() - pads];
    if run.is_empty() || !run.iter().all(|&b| in_alphabet(b)) {
        return false;
    }

    let (len, pads) = if pads > 0 {
        // Explicitly padded: the total must be a whole number of quartets.
        if bytes.len() % 4 != 0 {
            return false;
        }
        (bytes.len(), pads)
    } else {
        // Pad-stripped (or genuinely pad-free): reconstruct the implied pads.
        match bytes.len() % 4 {
            0 => (bytes.len(), 0),
            2 => (bytes.len() + 2, 2),
            3 => (bytes.len() + 1, 1),
            // A base64 quartet never has exactly one significant character.
            _ => return false,
        }
    };

    if len < MIN_ENCODED_LEN {
        return false;
    }
    // 8-byte salt + 16-byte blocks, base64-expanded: each pad count admits
    // exactly one length residue.
    let residue = (len - MIN_ENCODED_LEN) % 64;
    matches!((pads, residue), (0, 0) | (1, 44) | (2, 24))
}

/// Maximal codec-alphabet runs (with their trailing pads) inside `text`.
///
/// This is the scanning primitive for callers that pick encrypted fields out
/// of free-text documents: each yielded run is a candidate for
/// [`is_ciphertext_shaped`].
pub fn candidate_runs(text: &str) -> impl Iterator<Item = &str> {
    let bytes = text.as_bytes();
    let mut pos = 0;
    std::iter::from_fn(move || {
        while pos < bytes.len() && !in_alphabet(bytes[pos]) {
            pos += 1;
        }
        if pos >= bytes.len() {
            return None;
        }
        let start = pos;
        while pos < bytes.len() && in_alphabet(bytes[pos]) {
            pos += 1;
        }
        while pos < bytes.len() && bytes[pos] == PAD {
            pos += 1;
        }
        Some(&text[start..pos])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::cipher::{AesCipher, Cipher};
    use crate::crypto::codec::NameCodec;
    use proptest::prelude::*;

    #[test]
    fn ordinary_names_are_not_shaped() {
        for name in ["notes", "file.txt", "Tresorfoto.jpg", "a", "", "..", "_hidden"] {
            assert!(!is_ciphertext_shaped(name), "false positive on {name:?}");
        }
    }

    #[test]
    fn minimal_ciphertext_length_is_shaped() {
        // 24 bytes (salt + one block) encode to exactly 32 characters, no pads.
        assert!(is_ciphertext_shaped(&"A".repeat(32)));
        assert!(!is_ciphertext_shaped(&"A".repeat(31)));
        assert!(!is_ciphertext_shaped(&"A".repeat(33)));
    }

    #[test]
    fn padded_lengths_follow_the_residues() {
        // salt + 2 blocks = 40 bytes -> 54 chars + "==".
        let two_blocks = format!("{}==", "A".repeat(54));
        assert!(is_ciphertext_shaped(&two_blocks));
        // salt + 3 blocks = 56 bytes -> 75 chars + "=".
        let three_blocks = format!("{}=", "A".repeat(75));
        assert!(is_ciphertext_shaped(&three_blocks));
        // Wrong pad count for the length.
        assert!(!is_ciphertext_shaped(&format!("{}=", "A".repeat(54))));
    }

    #[test]
    fn pad_stripped_spellings_are_shaped() {
        assert!(is_ciphertext_shaped(&"A".repeat(54)));
        assert!(is_ciphertext_shaped(&"A".repeat(75)));
    }

    #[test]
    fn interior_pad_is_rejected() {
        let run = format!("{}={}", "A".repeat(31), "A".repeat(24));
        assert!(!is_ciphertext_shaped(&run));
    }

    #[test]
    fn runs_are_extracted_from_documents() {
        let secret = format!("{}==", "B".repeat(54));
        let doc = format!("password: {secret} (rotated)");
        let runs: Vec<_> = candidate_runs(&doc).collect();
        assert_eq!(runs, vec!["password", secret.as_str(), "rotated"]);
        assert_eq!(runs.iter().filter(|r| is_ciphertext_shaped(r)).count(), 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        /// Every name this system itself produces must classify as shaped,
        /// under both codec padding policies.
        #[test]
        fn prop_never_false_negative(name in ".{1,80}") {
            let cipher = AesCipher::with_iterations("pw", 1_000);
            let encrypted = cipher.encrypt(name.as_bytes()).unwrap();
            prop_assert!(is_ciphertext_shaped(&NameCodec::padded().encode(&encrypted)));
            prop_assert!(is_ciphertext_shaped(&NameCodec::unpadded().encode(&encrypted)));
        }
    }
}
