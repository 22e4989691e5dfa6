use btc_wallet_sdk::{
    api,
    bip39::{self, Language, Mnemonic, MnemonicErr, PhraseLength},
    util::encode_02x
};

const TREZOR_SEED: &str = "c55257c360c07c72029aebc1b53c05ed0362ada38ead3e3e9efa3708e53495531f09a6987599d18264c1e1c92f2cf141630c7a3c4ab7c81b2f001698e7463b04";

fn entropy(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(37).wrapping_add(11)).collect()
}

#[test]
fn round_trip_every_length_and_language() {
    for lang in Language::ALL {
        for bytes in [16, 20, 24, 28, 32] {
            let entropy = entropy(bytes);
            let mnemonic = Mnemonic::from_entropy(&entropy, lang).unwrap();
            assert_eq!(mnemonic.words().len(), bytes * 3 / 4);

            let parsed = Mnemonic::from_phrase(&mnemonic.phrase(), lang).unwrap();
            assert_eq!(&parsed.to_entropy().unwrap()[..], &entropy[..], "{} {}", lang.as_str(), bytes);
            assert!(bip39::validate(&mnemonic.phrase(), lang));
        }
    }
}

#[test]
fn random_mnemonics_validate() {
    for length in [PhraseLength::Twelve, PhraseLength::Fifteen, PhraseLength::Eighteen, PhraseLength::TwentyOne, PhraseLength::TwentyFour] {
        let mnemonic = Mnemonic::new(length, Language::English).unwrap();
        assert_eq!(mnemonic.words().len(), length.word_count());
        assert!(bip39::validate(&mnemonic.phrase(), Language::English));
    }
    assert_ne!(
        Mnemonic::new(PhraseLength::Twelve, Language::English).unwrap().phrase(),
        Mnemonic::new(PhraseLength::Twelve, Language::English).unwrap().phrase()
    );
}

#[test]
fn single_bit_checksum_flip() {
    let mnemonic = Mnemonic::from_entropy(&entropy(16), Language::English).unwrap();
    let list = Language::English.word_list();
    let mut words = mnemonic.words();

    //the low bits of the last word are checksum
    let last = Language::English.find_word(words[11]).unwrap();
    words[11] = list[(last ^ 1) as usize];
    let flipped = words.join(" ");

    assert_eq!(Mnemonic::from_phrase(&flipped, Language::English), Err(MnemonicErr::InvalidChecksum));
    assert!(!bip39::validate(&flipped, Language::English));
}

#[test]
fn phrase_errors() {
    assert_eq!(
        Mnemonic::from_phrase("abandon abandon abandon", Language::English),
        Err(MnemonicErr::InvalidWordCount(3))
    );
    assert_eq!(
        Mnemonic::from_phrase(&format!("{}zzz", "abandon ".repeat(11)), Language::English),
        Err(MnemonicErr::UnknownWord("zzz".to_string()))
    );
    assert_eq!(Mnemonic::from_entropy(&[0u8; 15], Language::English), Err(MnemonicErr::InvalidEntropyLength(120)));
}

#[test]
fn trezor_vector() {
    let mnemonic = Mnemonic::from_entropy(&[0u8; 16], Language::English).unwrap();
    let phrase = mnemonic.phrase();
    assert_eq!(phrase, format!("{}about", "abandon ".repeat(11)));
    assert_eq!(encode_02x(&mnemonic.to_seed("TREZOR")[..]), TREZOR_SEED);
    assert_eq!(api::mnemonic_to_seed_sync(&phrase, "TREZOR"), TREZOR_SEED);
}

#[test]
fn japanese_separator() {
    let mnemonic = Mnemonic::from_entropy(&entropy(16), Language::Japanese).unwrap();
    assert!(mnemonic.phrase().contains('\u{3000}'));

    //ascii spaces are accepted as well
    let spaced = mnemonic.words().join(" ");
    assert_eq!(Mnemonic::from_phrase(&spaced, Language::Japanese).unwrap(), mnemonic);
}

#[tokio::test]
async fn async_seed_is_byte_identical() {
    for lang in [Language::English, Language::Japanese, Language::Korean] {
        let mnemonic = Mnemonic::from_entropy(&entropy(32), lang).unwrap();
        let sync = mnemonic.to_seed("passphrase");
        let async_seed = mnemonic.to_seed_async("passphrase").await.unwrap();
        assert_eq!(sync[..], async_seed[..]);
    }

    let phrase = format!("{}about", "abandon ".repeat(11));
    let seed = api::mnemonic_to_seed(&phrase, "TREZOR").await.unwrap();
    assert_eq!(seed, TREZOR_SEED);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_seeds() {
    let phrase = format!("{}about", "abandon ".repeat(11));
    let handles: Vec<_> = (0..8)
        .map(|_| tokio::spawn(bip39::seed_from_phrase_async(phrase.clone(), "TREZOR".to_string())))
        .collect();

    for handle in handles {
        let seed = handle.await.unwrap().unwrap();
        assert_eq!(encode_02x(&seed[..]), TREZOR_SEED);
    }
}
