/*
    BIP39 word lists.

    Every list holds exactly 2048 NFKD normalised words.
*/

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::bip39::MnemonicErr;

mod en;
mod es;
mod fr;
mod it;
mod ja;
mod ko;
mod zh_hans;
mod zh_hant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    ChineseSimplified,
    ChineseTraditional,
    #[default]
    English,
    French,
    Italian,
    Japanese,
    Korean,
    Spanish
}

impl Language {
    pub const ALL: [Language; 8] = [
        Language::ChineseSimplified,
        Language::ChineseTraditional,
        Language::English,
        Language::French,
        Language::Italian,
        Language::Japanese,
        Language::Korean,
        Language::Spanish
    ];

    pub fn word_list(&self) -> &'static [&'static str; 2048] {
        match self {
            Language::ChineseSimplified => &zh_hans::WORDS,
            Language::ChineseTraditional => &zh_hant::WORDS,
            Language::English => &en::WORDS,
            Language::French => &fr::WORDS,
            Language::Italian => &it::WORDS,
            Language::Japanese => &ja::WORDS,
            Language::Korean => &ko::WORDS,
            Language::Spanish => &es::WORDS
        }
    }

    /// Index of a normalised word in the list.
    /// Only some lists are sorted by code point, so this is a linear scan.
    pub fn find_word(&self, word: &str) -> Option<u16> {
        self.word_list().iter().position(|w| *w == word).map(|i| i as u16)
    }

    /// Word separator used when rendering a phrase
    pub fn separator(&self) -> &'static str {
        match self {
            Language::Japanese => "\u{3000}",
            _ => " "
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::ChineseSimplified => "chinese_simplified",
            Language::ChineseTraditional => "chinese_traditional",
            Language::English => "english",
            Language::French => "french",
            Language::Italian => "italian",
            Language::Japanese => "japanese",
            Language::Korean => "korean",
            Language::Spanish => "spanish"
        }
    }
}

impl FromStr for Language {
    type Err = MnemonicErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .find(|l| l.as_str() == name)
            .copied()
            .ok_or(MnemonicErr::UnsupportedLanguage(s.to_string()))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_lists_are_complete_and_unique() {
        for lang in Language::ALL {
            let mut words = lang.word_list().to_vec();
            words.sort();
            words.dedup();
            assert_eq!(words.len(), 2048, "{}", lang);
        }
    }

    #[test]
    fn word_lookup() {
        assert_eq!(Language::English.find_word("abandon"), Some(0));
        assert_eq!(Language::English.find_word("zoo"), Some(2047));
        assert_eq!(Language::English.find_word("zzzz"), None);
        assert_eq!(Language::Spanish.find_word("\u{e1}baco"), None);
        assert_eq!(Language::Spanish.find_word("a\u{301}baco"), Some(0));
    }

    #[test]
    fn language_names() {
        assert_eq!("english".parse::<Language>().unwrap(), Language::English);
        assert_eq!("Chinese_Traditional".parse::<Language>().unwrap(), Language::ChineseTraditional);
        assert_eq!("klingon".parse::<Language>(), Err(MnemonicErr::UnsupportedLanguage("klingon".to_string())));
        assert_eq!(serde_json::to_string(&Language::ChineseSimplified).unwrap(), "\"chinese_simplified\"");
    }
}
