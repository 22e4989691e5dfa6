use std::fmt;

use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::{
    entropy,
    hash
};
use super::{
    Language,
    MnemonicErr
};

/**
    A checksummed mnemonic, held as word list indices.
    Indices are wiped when the value is dropped.
*/
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Mnemonic {
    #[zeroize(skip)]
    lang: Language,
    indices: Vec<u16>
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhraseLength {
    Twelve,
    Fifteen,
    Eighteen,
    TwentyOne,
    TwentyFour
}

impl PhraseLength {
    pub fn from_word_count(words: usize) -> Result<Self, MnemonicErr> {
        match words {
            12 => Ok(PhraseLength::Twelve),
            15 => Ok(PhraseLength::Fifteen),
            18 => Ok(PhraseLength::Eighteen),
            21 => Ok(PhraseLength::TwentyOne),
            24 => Ok(PhraseLength::TwentyFour),
            _ => Err(MnemonicErr::InvalidWordCount(words))
        }
    }

    pub fn from_entropy_bits(bits: usize) -> Result<Self, MnemonicErr> {
        match bits {
            128 | 160 | 192 | 224 | 256 => Self::from_word_count(bits / 32 * 3),
            _ => Err(MnemonicErr::InvalidEntropyLength(bits))
        }
    }

    pub fn word_count(&self) -> usize {
        match self {
            PhraseLength::Twelve => 12,
            PhraseLength::Fifteen => 15,
            PhraseLength::Eighteen => 18,
            PhraseLength::TwentyOne => 21,
            PhraseLength::TwentyFour => 24
        }
    }

    //+ENT/32 bit checksum on top
    pub fn entropy_bytes(&self) -> usize {
        self.word_count() * 4 / 3
    }
}

impl Mnemonic {
    /**
        Creates a new random mnemonic of the given length.
    */
    pub fn new(length: PhraseLength, lang: Language) -> Result<Self, MnemonicErr> {
        let bytes = entropy::random_bytes(length.entropy_bytes())
            .map_err(|e| MnemonicErr::Entropy(e.to_string()))?;
        Self::from_entropy(&bytes, lang)
    }

    /**
        Creates a new random mnemonic from the given amount of entropy bits.
        128, 160, 192, 224 or 256.
    */
    pub fn generate(entropy_bits: usize, lang: Language) -> Result<Self, MnemonicErr> {
        Self::new(PhraseLength::from_entropy_bits(entropy_bits)?, lang)
    }

    /**
        Encodes entropy as a mnemonic.

        The top ENT/32 bits of SHA-256(entropy) are appended to the entropy and
        the result is read as 11 bit word list indices.
    */
    pub fn from_entropy(entropy: &[u8], lang: Language) -> Result<Self, MnemonicErr> {
        let length = PhraseLength::from_entropy_bits(entropy.len() * 8)?;
        let checksum_bits = entropy.len() / 4;
        let checksum = hash::sha256(entropy)[0] >> (8 - checksum_bits);

        let mut indices: Vec<u16> = Vec::with_capacity(length.word_count());
        let mut acc: u32 = 0;
        let mut acc_len: usize = 0;
        let groups = entropy.iter().map(|b| (*b, 8)).chain(std::iter::once((checksum, checksum_bits)));
        for (value, len) in groups {
            acc = (acc << len) | value as u32;
            acc_len += len;
            while acc_len >= 11 {
                acc_len -= 11;
                indices.push(((acc >> acc_len) & 0x7ff) as u16);
            }
            acc &= (1 << acc_len) - 1;
        }
        acc.zeroize();

        Ok(Self { lang, indices })
    }

    /**
        Parses a phrase in the given language.
        The phrase is NFKD normalised and split on any whitespace, so the
        ideographic space used by Japanese phrases is accepted.
    */
    pub fn from_phrase(phrase: &str, lang: Language) -> Result<Self, MnemonicErr> {
        let normalised: Zeroizing<String> = Zeroizing::new(phrase.nfkd().collect());
        let words: Vec<&str> = normalised.split_whitespace().collect();
        PhraseLength::from_word_count(words.len())?;

        let indices = words
            .iter()
            .map(|w| lang.find_word(w).ok_or_else(|| MnemonicErr::UnknownWord(w.to_string())))
            .collect::<Result<Vec<u16>, MnemonicErr>>()?;

        let mnemonic = Self { lang, indices };
        mnemonic.to_entropy()?;
        Ok(mnemonic)
    }

    /**
        Recovers the entropy, verifying the checksum.
    */
    pub fn to_entropy(&self) -> Result<Zeroizing<Vec<u8>>, MnemonicErr> {
        let length = PhraseLength::from_word_count(self.indices.len())?;
        let entropy_len = length.entropy_bytes();
        let checksum_bits = entropy_len / 4;

        let mut bytes: Zeroizing<Vec<u8>> = Zeroizing::new(Vec::with_capacity(entropy_len + 1));
        let mut acc: u32 = 0;
        let mut acc_len: usize = 0;
        for index in &self.indices {
            acc = (acc << 11) | *index as u32;
            acc_len += 11;
            while acc_len >= 8 {
                acc_len -= 8;
                bytes.push((acc >> acc_len) as u8);
            }
            acc &= (1 << acc_len) - 1;
        }

        //24 words leave a whole checksum byte, shorter phrases leave the bits in acc
        let found = if bytes.len() > entropy_len { bytes[entropy_len] } else { acc as u8 };
        bytes.truncate(entropy_len);
        acc.zeroize();

        let expected = hash::sha256(&bytes[..])[0] >> (8 - checksum_bits);
        if found != expected {
            return Err(MnemonicErr::InvalidChecksum)
        }
        Ok(bytes)
    }

    pub fn language(&self) -> Language {
        self.lang
    }

    pub fn words(&self) -> Vec<&'static str> {
        let list = self.lang.word_list();
        self.indices.iter().map(|i| list[*i as usize]).collect()
    }

    /// The phrase joined with the language's separator
    pub fn phrase(&self) -> String {
        self.words().join(self.lang.separator())
    }

    pub fn to_seed(&self, passphrase: &str) -> Zeroizing<[u8; 64]> {
        let phrase = Zeroizing::new(self.phrase());
        super::seed_from_phrase(&phrase, passphrase)
    }

    /// Same seed as to_seed, computed off the async executor
    pub async fn to_seed_async(&self, passphrase: &str) -> Result<Zeroizing<[u8; 64]>, MnemonicErr> {
        super::seed_from_phrase_async(self.phrase(), passphrase.to_string()).await
    }
}

impl fmt::Debug for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mnemonic")
         .field("lang", &self.lang)
         .field("words", &self.indices.len())
         .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn zero_entropy_vector() {
        let m = Mnemonic::from_entropy(&[0u8; 16], Language::English).unwrap();
        assert_eq!(m.phrase(), ABANDON);
        assert_eq!(*m.to_entropy().unwrap(), vec![0u8; 16]);
    }

    #[test]
    fn bip39_entropy_vectors() {
        //Trezor reference vectors
        let cases = [
            ("7f7f7f7f7f7f7f7f7f7f7f7f7f7f7f7f", "legal winner thank year wave sausage worth useful legal winner thank yellow"),
            ("80808080808080808080808080808080", "letter advice cage absurd amount doctor acoustic avoid letter advice cage above"),
            ("ffffffffffffffffffffffffffffffff", "zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo wrong"),
            ("000000000000000000000000000000000000000000000000", "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon agent"),
            ("0000000000000000000000000000000000000000000000000000000000000000", "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon art"),
            ("ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff", "zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo vote")
        ];

        for (entropy, phrase) in cases {
            let bytes = hex::decode(entropy).unwrap();
            assert_eq!(Mnemonic::from_entropy(&bytes, Language::English).unwrap().phrase(), phrase);
            assert_eq!(*Mnemonic::from_phrase(phrase, Language::English).unwrap().to_entropy().unwrap(), bytes);
        }
    }

    #[test]
    fn phrase_errors() {
        assert_eq!(
            Mnemonic::from_phrase("abandon abandon abandon", Language::English),
            Err(MnemonicErr::InvalidWordCount(3))
        );
        assert!(Language::English.find_word("zzzz").is_none());
        assert_eq!(
            Mnemonic::from_phrase(&ABANDON.replace("about", "zzzz"), Language::English),
            Err(MnemonicErr::UnknownWord("zzzz".to_string()))
        );
        //Last word carries the checksum
        assert_eq!(
            Mnemonic::from_phrase(&ABANDON.replace("about", "abandon"), Language::English),
            Err(MnemonicErr::InvalidChecksum)
        );
        assert_eq!(Mnemonic::from_entropy(&[0u8; 15], Language::English), Err(MnemonicErr::InvalidEntropyLength(120)));
    }

    #[test]
    fn generated_lengths() {
        for (bits, words) in [(128, 12), (160, 15), (192, 18), (224, 21), (256, 24)] {
            let m = Mnemonic::generate(bits, Language::English).unwrap();
            assert_eq!(m.words().len(), words);
            assert_eq!(m.to_entropy().unwrap().len(), bits / 8);
        }
        assert_eq!(Mnemonic::generate(100, Language::English), Err(MnemonicErr::InvalidEntropyLength(100)));
    }

    #[test]
    fn japanese_uses_ideographic_space() {
        let m = Mnemonic::from_entropy(&[0u8; 16], Language::Japanese).unwrap();
        let phrase = m.phrase();
        assert_eq!(phrase.split('\u{3000}').count(), 12);
        assert_eq!(Mnemonic::from_phrase(&phrase, Language::Japanese).unwrap(), m);
    }
}
