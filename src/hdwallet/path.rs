/*
    This module parses derivation paths passed in as strings
    into vectors of ChildOptions that can be used to derive a child key.
*/

use std::{fmt, str::FromStr};

use crate::hdwallet::{
    ChildOptions,
    HDWError,
    HARDENED_OFFSET
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Path {
    pub children: Vec<ChildOptions>
}

impl Path {
    pub fn empty() -> Self {
        Self {
            children: vec![]
        }
    }

    /**
        m/purpose'/coin'/account'/change/index
        The layout shared by BIP44, BIP49, BIP84 and BIP86.
    */
    pub fn from_purpose(purpose: u32, coin: u32, account: u32, change: u32, index: u32) -> Result<Self, HDWError> {
        let children = vec![
            ChildOptions::Hardened(purpose),
            ChildOptions::Hardened(coin),
            ChildOptions::Hardened(account),
            ChildOptions::Normal(change),
            ChildOptions::Normal(index)
        ];
        for child in &children {
            child.index()?;
        }

        Ok(Self { children })
    }

    pub fn push(mut self, child: ChildOptions) -> Result<Self, HDWError> {
        child.index()?;
        if self.children.len() >= u8::MAX as usize { return Err(HDWError::MaxDepthExceeded) }
        self.children.push(child);
        Ok(self)
    }
}

impl FromStr for Path {
    type Err = HDWError;

    /// Hardened children are marked with ', h or H
    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let mut parts = path.trim().split('/');
        match parts.next() {
            Some("m") | Some("M") => {},
            _ => return Err(HDWError::BadPath(path.to_string()))
        }

        let mut children: Vec<ChildOptions> = vec![];
        for part in parts {
            let (digits, hardened) = match part.strip_suffix(&['\'', 'h', 'H'][..]) {
                Some(x) => (x, true),
                None => (part, false)
            };
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(HDWError::BadPath(path.to_string()))
            }
            let index: u32 = digits.parse().map_err(|_| HDWError::BadPath(path.to_string()))?;
            if index >= HARDENED_OFFSET { return Err(HDWError::IndexTooLarge(index)) }

            children.push(if hardened { ChildOptions::Hardened(index) } else { ChildOptions::Normal(index) });
        }

        if children.len() > u8::MAX as usize { return Err(HDWError::MaxDepthExceeded) }
        Ok(Self { children })
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "m")?;
        for child in &self.children {
            match child {
                ChildOptions::Normal(x) => write!(f, "/{}", x)?,
                ChildOptions::Hardened(x) => write!(f, "/{}'", x)?
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_test() {
        let path_str = "m/84'/0'/0'/0/0";
        let path_struct = Path {
            children: vec![
                ChildOptions::Hardened(84),
                ChildOptions::Hardened(0),
                ChildOptions::Hardened(0),
                ChildOptions::Normal(0),
                ChildOptions::Normal(0)
            ]
        };

        assert_eq!(path_str, path_struct.to_string());
        assert_eq!(path_str.parse::<Path>().unwrap(), path_struct);
        assert_eq!("m/84h/0H/0'/0/0".parse::<Path>().unwrap(), path_struct);
        assert_eq!(Path::from_purpose(84, 0, 0, 0, 0).unwrap(), path_struct);
    }

    #[test]
    fn bad_paths() {
        assert_eq!("m".parse::<Path>().unwrap(), Path::empty());
        assert_eq!("44'/0'".parse::<Path>(), Err(HDWError::BadPath("44'/0'".to_string())));
        assert_eq!("m//0".parse::<Path>(), Err(HDWError::BadPath("m//0".to_string())));
        assert_eq!("m/-1".parse::<Path>(), Err(HDWError::BadPath("m/-1".to_string())));
        assert_eq!("m/2147483648".parse::<Path>(), Err(HDWError::IndexTooLarge(2147483648)));
        assert_eq!(Path::from_purpose(44, 0, 0, 0, u32::MAX), Err(HDWError::IndexTooLarge(u32::MAX)));

        let deep = format!("m{}", "/0".repeat(256));
        assert_eq!(deep.parse::<Path>(), Err(HDWError::MaxDepthExceeded));
    }
}
