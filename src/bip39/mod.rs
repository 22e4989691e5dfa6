/*
    This module implements the BIP-39 standard for mnemonic phrases.

    Entropy of 128 to 256 bits is checksummed, split into 11 bit groups and
    mapped onto one of eight 2048 word lists. The phrase is stretched into a
    64 byte seed with PBKDF2-HMAC-SHA512.

    Reference:
        https://github.com/bitcoin/bips/blob/master/bip-0039.mediawiki
*/

mod lang;
mod mnemonic;

use pbkdf2::pbkdf2_hmac;
use sha2::Sha512;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use zeroize::Zeroizing;

pub use lang::Language;
pub use mnemonic::{Mnemonic, PhraseLength};

const PBKDF2_ROUNDS: u32 = 2048;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MnemonicErr {
    #[error("mnemonic checksum does not match its entropy")]
    InvalidChecksum,
    #[error("unsupported word count {0}, expected 12, 15, 18, 21 or 24")]
    InvalidWordCount(usize),
    #[error("'{0}' is not in the word list")]
    UnknownWord(String),
    #[error("unsupported entropy length of {0} bits")]
    InvalidEntropyLength(usize),
    #[error("unsupported language '{0}'")]
    UnsupportedLanguage(String),
    #[error("entropy source failed: {0}")]
    Entropy(String),
    #[error("seed task failed: {0}")]
    SeedTask(String)
}

/**
    Stretches a phrase into a 64 byte seed.

    The phrase is not checked against any word list, the seed is defined
    over the NFKD normalised string alone.
*/
pub fn seed_from_phrase(phrase: &str, passphrase: &str) -> Zeroizing<[u8; 64]> {
    let password: Zeroizing<String> = Zeroizing::new(phrase.nfkd().collect());
    let salt: Zeroizing<String> = Zeroizing::new(format!("mnemonic{}", passphrase.nfkd().collect::<String>()));

    let mut seed = Zeroizing::new([0u8; 64]);
    pbkdf2_hmac::<Sha512>(password.as_bytes(), salt.as_bytes(), PBKDF2_ROUNDS, &mut seed[..]);
    seed
}

/**
    Runs seed stretching on the blocking thread pool of the current tokio runtime.
    Output is byte identical to seed_from_phrase. Panics when polled outside a
    tokio runtime.
*/
pub async fn seed_from_phrase_async(phrase: String, passphrase: String) -> Result<Zeroizing<[u8; 64]>, MnemonicErr> {
    let phrase = Zeroizing::new(phrase);
    let passphrase = Zeroizing::new(passphrase);
    tokio::task::spawn_blocking(move || seed_from_phrase(&phrase, &passphrase))
        .await
        .map_err(|e| MnemonicErr::SeedTask(e.to_string()))
}

/// True iff every word is known and the checksum matches
pub fn validate(phrase: &str, lang: Language) -> bool {
    Mnemonic::from_phrase(phrase, lang).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trezor_seed_vector() {
        let phrase = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
        assert_eq!(
            hex::encode(*seed_from_phrase(phrase, "TREZOR")),
            "c55257c360c07c72029aebc1b53c05ed0362ada38ead3e3e9efa3708e53495531f09a6987599d18264c1e1c92f2cf141630c7a3c4ab7c81b2f001698e7463b04"
        );
    }

    #[test]
    fn seed_ignores_word_list() {
        //Any string stretches, validity is a separate question
        assert_eq!(seed_from_phrase("not a mnemonic", "").len(), 64);
        assert!(!validate("not a mnemonic", Language::English));
    }

    #[test]
    fn seed_normalises_input() {
        //Precomposed and decomposed forms of the same passphrase agree
        assert_eq!(
            *seed_from_phrase("abandon about", "caf\u{e9}"),
            *seed_from_phrase("abandon about", "cafe\u{301}")
        );
    }
}
