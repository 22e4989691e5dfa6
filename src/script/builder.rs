/*
    Script builder module.

    Scripts are assembled front to back. Data pushes pick the smallest
    push opcode that fits the data.
*/

use super::Script;

#[derive(Debug, Clone, Default)]
pub struct Builder {
    code: Vec<u8>
}

impl Builder {
    /// Return a new instance of self
    pub fn new() -> Self  {
        Self { code: Vec::new() }
    }

    /// Push an opcode into self
    pub fn push_opcode(mut self, opcode: Opcode) -> Self {
        self.code.push(opcode.into_u8());
        self
    }

    /// Push data onto the stack with the minimal push opcode
    pub fn push_data(mut self, data: &[u8]) -> Self {
        let len = data.len();
        match len {
            0..=0x4b => self.code.push(len as u8),
            0x4c..=0xff => {
                self.code.push(opcodes::OP_PUSHDATA1.into_u8());
                self.code.push(len as u8);
            },
            0x100..=0xffff => {
                self.code.push(opcodes::OP_PUSHDATA2.into_u8());
                self.code.extend_from_slice(&(len as u16).to_le_bytes());
            },
            _ => {
                self.code.push(opcodes::OP_PUSHDATA4.into_u8());
                self.code.extend_from_slice(&(len as u32).to_le_bytes());
            }
        }
        self.code.extend_from_slice(data);
        self
    }

    /// Push a number between 0 and 16 as OP_0 or OP_1 to OP_16
    pub fn push_small_int(self, n: u8) -> Self {
        self.push_opcode(Opcode::from_small_int(n))
    }

    /// Convert self into a script
    pub fn into_script(self) -> Script {
        Script::new(self.code)
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    code: u8
}

impl Opcode {
    pub fn into_u8(self) -> u8 {
        self.code
    }

    /**
        OP_0 for zero, OP_1 (0x51) to OP_16 (0x60) otherwise.
        Values above 16 saturate to OP_16.
    */
    pub fn from_small_int(n: u8) -> Self {
        match n {
            0 => opcodes::OP_0,
            n => Opcode { code: 0x50 + n.min(16) }
        }
    }

    /// Inverse of from_small_int
    pub fn to_small_int(self) -> Option<u8> {
        match self.code {
            0x00 => Some(0),
            0x51..=0x60 => Some(self.code - 0x50),
            _ => None
        }
    }
}

impl From<u8> for Opcode {
    fn from(code: u8) -> Self {
        Self { code }
    }
}

// Opcode constants
pub mod opcodes {
    use super::Opcode;

    /// Push an empty array onto the stack
    pub const OP_0: Opcode = Opcode {code: 0x00};
    /// Read the next byte as N; push the next N bytes as an array onto the stack
    pub const OP_PUSHDATA1: Opcode = Opcode {code: 0x4c};
    /// Read the next 2 bytes as N; push the next N bytes as an array onto the stack
    pub const OP_PUSHDATA2: Opcode = Opcode {code: 0x4d};
    /// Read the next 4 bytes as N; push the next N bytes as an array onto the stack
    pub const OP_PUSHDATA4: Opcode = Opcode {code: 0x4e};
    /// Push the number 1 onto the stack
    pub const OP_1: Opcode = Opcode {code: 0x51};
    /// Push the number 16 onto the stack
    pub const OP_16: Opcode = Opcode {code: 0x60};
    /// Duplicates the top stack item
    pub const OP_DUP: Opcode = Opcode {code: 0x76};
    /// Pushes 1 if the inputs are exactly equal, 0 otherwise
    pub const OP_EQUAL: Opcode = Opcode {code: 0x87};
    /// Returns success if the inputs are exactly equal, failure otherwise
    pub const OP_EQUALVERIFY: Opcode = Opcode {code: 0x88};
    /// Pop the top stack item and push its RIPEMD160(SHA256) hash
    pub const OP_HASH160: Opcode = Opcode {code: 0xa9};
    /// Pushes 1 if the signature is valid for the public key and transaction
    pub const OP_CHECKSIG: Opcode = Opcode {code: 0xac};
    /// Pop N, N pubkeys, M, M signatures and a dummy. Pushes 1 if M of the N keys signed
    pub const OP_CHECKMULTISIG: Opcode = Opcode {code: 0xae};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_push_sizes() {
        let script = Builder::new().push_data(&[0xab; 20]).into_script();
        assert_eq!(script.as_bytes()[0], 0x14);
        assert_eq!(script.len(), 21);

        let script = Builder::new().push_data(&[0u8; 80]).into_script();
        assert_eq!(script.as_bytes()[..2], [0x4c, 80]);

        let script = Builder::new().push_data(&[0u8; 300]).into_script();
        assert_eq!(script.as_bytes()[..3], [0x4d, 0x2c, 0x01]);

        assert_eq!(Builder::new().push_data(&[]).into_script().as_bytes(), &[0x00]);
    }

    #[test]
    fn small_ints() {
        assert_eq!(Opcode::from_small_int(0), opcodes::OP_0);
        assert_eq!(Opcode::from_small_int(1), opcodes::OP_1);
        assert_eq!(Opcode::from_small_int(16), opcodes::OP_16);
        assert_eq!(opcodes::OP_16.to_small_int(), Some(16));
        assert_eq!(opcodes::OP_DUP.to_small_int(), None);
    }
}
