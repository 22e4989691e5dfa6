#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionPrefix {
    //One byte version prefixes
        BTCAddress = 0x00,
        BTCTestNetAddress = 0x6F,
        P2ScriptAddress = 0x05,
        TestnetP2SHAddress = 0xC4,
        PrivateKeyWIF = 0x80,
        TestNetPrivateKeyWIF = 0xEF,

    //Four byte version prefixes
        //BIP-32
        Xprv = 0x0488ADE4, //Legacy P2PKH
        Xpub = 0x0488B21E,
        Tprv = 0x04358394,
        Tpub = 0x043587CF,
        //BIP-49
        Yprv = 0x049D7878, //P2SH nested P2WPKH
        Ypub = 0x049D7CB2,
        Uprv = 0x044A4E28,
        Upub = 0x044A5262,
        //BIP-84
        Zprv = 0x04B2430C, //P2WPKH
        Zpub = 0x04B24746,
        Vprv = 0x045F18BC,
        Vpub = 0x045F1CF6,
}

impl VersionPrefix {
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            //Single byte address and WIF prefixes
            VersionPrefix::BTCAddress |
            VersionPrefix::BTCTestNetAddress |
            VersionPrefix::P2ScriptAddress |
            VersionPrefix::TestnetP2SHAddress |
            VersionPrefix::PrivateKeyWIF |
            VersionPrefix::TestNetPrivateKeyWIF => vec![*self as u32 as u8],

            //Extended key prefixes are 4 bytes long
            _ => (*self as u32).to_be_bytes().to_vec()
        }
    }

    /// Single byte prefix of an address or WIF.
    pub fn byte(&self) -> u8 {
        *self as u32 as u8
    }

    pub fn from_int(int: u32) -> Option<Self> {
        Some(match int {
            0x00 => Self::BTCAddress,
            0x6F => Self::BTCTestNetAddress,
            0x05 => Self::P2ScriptAddress,
            0xC4 => Self::TestnetP2SHAddress,
            0x80 => Self::PrivateKeyWIF,
            0xEF => Self::TestNetPrivateKeyWIF,
            0x0488ADE4 => Self::Xprv,
            0x0488B21E => Self::Xpub,
            0x04358394 => Self::Tprv,
            0x043587CF => Self::Tpub,
            0x049D7878 => Self::Yprv,
            0x049D7CB2 => Self::Ypub,
            0x044A4E28 => Self::Uprv,
            0x044A5262 => Self::Upub,
            0x04B2430C => Self::Zprv,
            0x04B24746 => Self::Zpub,
            0x045F18BC => Self::Vprv,
            0x045F1CF6 => Self::Vpub,
            _ => return None
        })
    }

    /// True for extended private key prefixes
    pub fn is_extended_private(&self) -> bool {
        matches!(self,
            Self::Xprv | Self::Tprv | Self::Yprv | Self::Uprv | Self::Zprv | Self::Vprv
        )
    }

    /// True for extended public key prefixes
    pub fn is_extended_public(&self) -> bool {
        matches!(self,
            Self::Xpub | Self::Tpub | Self::Ypub | Self::Upub | Self::Zpub | Self::Vpub
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_widths() {
        assert_eq!(VersionPrefix::BTCAddress.to_bytes(), vec![0x00]);
        assert_eq!(VersionPrefix::TestNetPrivateKeyWIF.to_bytes(), vec![0xef]);
        assert_eq!(VersionPrefix::Xprv.to_bytes(), vec![0x04, 0x88, 0xad, 0xe4]);
        assert_eq!(VersionPrefix::from_int(0x04b24746), Some(VersionPrefix::Zpub));
        assert_eq!(VersionPrefix::from_int(0xdeadbeef), None);
    }

    #[test]
    fn extended_families() {
        assert!(VersionPrefix::Tprv.is_extended_private());
        assert!(!VersionPrefix::Tprv.is_extended_public());
        assert!(VersionPrefix::Vpub.is_extended_public());
        assert!(!VersionPrefix::BTCAddress.is_extended_private());
    }
}
