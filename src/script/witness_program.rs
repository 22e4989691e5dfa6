use crate::{
    encoding::bech32::{
        self,
        Bech32Err
    },
    network::Network,
    script::{
        Opcode,
        Script,
        ScriptBuilder,
        ScriptErr
    }
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WitnessProgram {
    pub version: u8,
    pub program: Vec<u8>
}

impl WitnessProgram {
    /**
        Creates a new witness program given a version and data.

        For P2WPKH, version is 0 and data is the Hash160 of the public key.
        For P2WSH, version is 0 and data is the SHA256 of the redeem script.
        For P2TR, version is 1 and data is the tweaked x-only output key.
    */
    pub fn new(version: u8, program: Vec<u8>) -> Result<Self, ScriptErr> {
        if version > 16 { return Err(ScriptErr::BadVersion(version)) }
        if !Self::is_valid_length(version, program.len()) {
            return Err(ScriptErr::InvalidProgramLength(program.len()))
        }

        Ok(Self {
            version,
            program
        })
    }

    /// Version 0 programs are 20 or 32 bytes, later versions 2 to 40
    pub fn is_valid_length(version: u8, len: usize) -> bool {
        match version {
            0 => len == 20 || len == 32,
            _ => (2..=40).contains(&len)
        }
    }

    pub fn to_address(&self, network: Network) -> Result<String, Bech32Err> {
        bech32::encode(network.params().bech32_hrp, self)
    }

    /// Decodes a segwit address, returning its network and program
    pub fn from_address(address: &str) -> Result<(Network, Self), Bech32Err> {
        let (hrp, program) = bech32::decode(address)?;
        let network = Network::from_hrp(&hrp).ok_or(Bech32Err::InvalidHrp)?;
        Ok((network, program))
    }

    /// version opcode | program push
    pub fn to_scriptpubkey(&self) -> Script {
        ScriptBuilder::new()
            .push_opcode(Opcode::from_small_int(self.version))
            .push_data(&self.program)
            .into_script()
    }

    /// Reads the program back out of a witness locking script
    pub fn from_script(script: &Script) -> Option<Self> {
        let (version_op, rest) = script.as_bytes().split_first()?;
        let (len, program) = rest.split_first()?;
        let version = Opcode::from(*version_op).to_small_int()?;
        if *len as usize != program.len() { return None }

        Self::new(version, program.to_vec()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_and_address_forms() {
        let script = Script::from_hex("6a29052003").unwrap();
        let p2wsh = Script::p2wsh(&script);
        let program = WitnessProgram::from_script(&p2wsh).unwrap();
        assert_eq!(program.version, 0);
        assert_eq!(program.to_scriptpubkey(), p2wsh);

        assert_eq!(program.to_address(Network::Bitcoin).unwrap(), "bc1q4sr2gyed4ww8zm0t9ktn47qxlu2nhl5ejkf6fjzfttnsjvxdkqjqe7yhq9");
        assert_eq!(program.to_address(Network::Testnet).unwrap(), "tb1q4sr2gyed4ww8zm0t9ktn47qxlu2nhl5ejkf6fjzfttnsjvxdkqjqwkjc62");
        assert_eq!(
            WitnessProgram::from_address("tb1q4sr2gyed4ww8zm0t9ktn47qxlu2nhl5ejkf6fjzfttnsjvxdkqjqwkjc62").unwrap(),
            (Network::Testnet, program)
        );
    }

    #[test]
    fn program_rules() {
        assert_eq!(WitnessProgram::new(17, vec![0; 20]), Err(ScriptErr::BadVersion(17)));
        assert_eq!(WitnessProgram::new(0, vec![0; 21]), Err(ScriptErr::InvalidProgramLength(21)));
        assert!(WitnessProgram::new(1, vec![0; 40]).is_ok());
        assert!(WitnessProgram::from_script(&Script::from_hex("0014aabb").unwrap()).is_none());
    }
}
