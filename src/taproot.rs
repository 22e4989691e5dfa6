/*
    This module implements methods relating to Taproot key and address computing.

    Output keys commit to an internal key and an optional script tree:
        Q = P + int(TapTweak(x(P) || merkle_root)) * G

    Script trees are built bottom up. Branch hashes sort their children,
    so the merkle root does not depend on left/right placement.
*/
use secp256k1::{Keypair, Parity, Scalar};
use thiserror::Error;

use crate::{
    ec::{Context, EcError},
    hash::tagged_hash,
    key::{PrivKey, SchnorrPublicKey},
    script::Script
};

/// Leaf version of BIP342 tapscript
pub const TAPSCRIPT_LEAF_VERSION: u8 = 0xc0;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaprootErr {
    #[error("script tree needs at least one leaf")]
    EmptyTree,
    #[error("tweak is not a valid scalar or produced an invalid key")]
    InvalidTweak,
    #[error(transparent)]
    Ec(#[from] EcError)
}

pub trait TaprootTaggedHash {
    fn from_slice(slice: &[u8]) -> [u8; 32];
}

/// Macro to create tagged hash types
macro_rules! taproot_tagged_hashes {
    ($name: ident, $tag: expr) => {
        pub struct $name;

        impl TaprootTaggedHash for $name {
            fn from_slice(slice: &[u8]) -> [u8; 32] {
                tagged_hash($tag, slice)
            }
        }
    }
}

taproot_tagged_hashes!(TapTweakHash, "TapTweak");     // Final key tweak
taproot_tagged_hashes!(TapBranchHash, "TapBranch");   // Script tree branch nodes
taproot_tagged_hashes!(TapLeafHash, "TapLeaf");       // Script tree leaf nodes
taproot_tagged_hashes!(TapSighashHash, "TapSighash"); // BIP341 signature message

impl TapTweakHash {
    /// Tweak of an internal key and either the merkle root of a script tree or nothing.
    pub fn from_key_and_tweak(key: &SchnorrPublicKey, merkle_root: Option<[u8; 32]>) -> [u8; 32] {
        let mut data = key.as_bytes().to_vec();
        if let Some(root) = merkle_root {
            data.extend_from_slice(&root);
        }
        TapTweakHash::from_slice(&data)
    }
}

impl TapBranchHash {
    /// Smaller hash first, then TapBranch hash the concatenation
    pub fn combined_hash(a: [u8; 32], b: [u8; 32]) -> [u8; 32] {
        let (first, second) = if b < a { (b, a) } else { (a, b) };

        let mut preimage = first.to_vec();
        preimage.extend_from_slice(&second);
        TapBranchHash::from_slice(&preimage)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Leaf {
    version: u8,
    script: Script
}

impl Leaf {
    pub fn new_with_version(version: u8, script: &Script) -> Self {
        Self {
            version,
            script: script.clone()
        }
    }

    /// New leaf with the default version of 0xc0
    pub fn new(script: &Script) -> Self {
        Self::new_with_version(TAPSCRIPT_LEAF_VERSION, script)
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    /// TapLeaf(version || compact_size(script) || script)
    pub fn tapleaf_hash(&self) -> [u8; 32] {
        let mut data = vec![self.version];
        data.extend_from_slice(&self.script.prefix_compactsize());
        TapLeafHash::from_slice(&data)
    }
}

/**
    Taproot script tree.
    Branch nodes store their hash so the merkle root is read in constant time.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptTree {
    Leaf(Leaf),
    Branch {
        left: Box<ScriptTree>,
        right: Box<ScriptTree>,
        hash: [u8; 32]
    }
}

impl ScriptTree {
    pub fn leaf(leaf: Leaf) -> Self {
        ScriptTree::Leaf(leaf)
    }

    pub fn branch(left: ScriptTree, right: ScriptTree) -> Self {
        let hash = TapBranchHash::combined_hash(left.merkle_root(), right.merkle_root());
        ScriptTree::Branch {
            left: Box::new(left),
            right: Box::new(right),
            hash
        }
    }

    /**
        Builds the most balanced tree over the given scripts.
        Neighbouring nodes are paired level by level. An odd node out is
        carried up to the next level unchanged.
    */
    pub fn from_scripts(scripts: &[Script]) -> Result<Self, TaprootErr> {
        let mut level: Vec<ScriptTree> = scripts.iter()
            .map(|s| ScriptTree::leaf(Leaf::new(s)))
            .collect();
        if level.is_empty() { return Err(TaprootErr::EmptyTree) }

        while level.len() > 1 {
            let mut next: Vec<ScriptTree> = Vec::with_capacity(level.len() / 2 + 1);
            let mut nodes = level.into_iter();
            while let Some(left) = nodes.next() {
                match nodes.next() {
                    Some(right) => next.push(ScriptTree::branch(left, right)),
                    None => next.push(left)
                }
            }
            level = next;
        }

        level.pop().ok_or(TaprootErr::EmptyTree)
    }

    /// Root hash of the tree. For a single leaf this is its TapLeaf hash.
    pub fn merkle_root(&self) -> [u8; 32] {
        match self {
            ScriptTree::Leaf(leaf) => leaf.tapleaf_hash(),
            ScriptTree::Branch { hash, .. } => *hash
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, ScriptTree::Leaf(_))
    }

    /// Leaves in depth first, left to right order
    pub fn leaves(&self) -> Vec<&Leaf> {
        match self {
            ScriptTree::Leaf(leaf) => vec![leaf],
            ScriptTree::Branch { left, right, .. } => {
                let mut leaves = left.leaves();
                leaves.extend(right.leaves());
                leaves
            }
        }
    }

    /**
        Sibling hashes from the leaf up to the root, the merkle path a
        control block carries. None if the leaf is not in the tree.
    */
    pub fn merkle_path(&self, leaf: &Leaf) -> Option<Vec<[u8; 32]>> {
        match self {
            ScriptTree::Leaf(l) => if l == leaf { Some(vec![]) } else { None },
            ScriptTree::Branch { left, right, .. } => {
                if let Some(mut path) = left.merkle_path(leaf) {
                    path.push(right.merkle_root());
                    return Some(path)
                }
                let mut path = right.merkle_path(leaf)?;
                path.push(left.merkle_root());
                Some(path)
            }
        }
    }
}

/// Checks that a leaf and merkle path hash up to the given root
pub fn verify_merkle_path(leaf: &Leaf, path: &[[u8; 32]], merkle_root: [u8; 32]) -> bool {
    path.iter().fold(leaf.tapleaf_hash(), |acc, sibling| TapBranchHash::combined_hash(acc, *sibling)) == merkle_root
}

fn tweak_scalar(internal_key: &SchnorrPublicKey, merkle_root: Option<[u8; 32]>) -> Result<Scalar, TaprootErr> {
    let tweak = TapTweakHash::from_key_and_tweak(internal_key, merkle_root);
    Scalar::from_be_bytes(tweak).map_err(|_| TaprootErr::InvalidTweak)
}

/**
    Tweaks an internal key into a taproot output key.
    Returns the x-only output key and the parity of the full point.
*/
pub fn output_key(ctx: &Context, internal_key: &SchnorrPublicKey, merkle_root: Option<[u8; 32]>) -> Result<(SchnorrPublicKey, Parity), TaprootErr> {
    let tweak = tweak_scalar(internal_key, merkle_root)?;
    let (tweaked, parity) = internal_key.x_only()
        .add_tweak(ctx.secp(), &tweak)
        .map_err(|_| TaprootErr::InvalidTweak)?;

    Ok((SchnorrPublicKey::from(tweaked), parity))
}

/**
    Tweaks a private key so that it signs for the output key of its own
    x-only public key. The secret is negated first when the internal point
    has an odd y coordinate.
*/
pub fn tweak_keypair(ctx: &Context, key: &PrivKey, merkle_root: Option<[u8; 32]>) -> Result<Keypair, TaprootErr> {
    let (internal, parity) = key.secret_key().x_only_public_key(ctx.secp());
    let key_for_tweak = if parity == Parity::Odd {
        key.secret_key().negate()
    } else {
        *key.secret_key()
    };

    let tweak = tweak_scalar(&SchnorrPublicKey::from(internal), merkle_root)?;
    let tweaked = key_for_tweak.add_tweak(&tweak).map_err(|_| TaprootErr::InvalidTweak)?;
    Ok(Keypair::from_secret_key(ctx.secp(), &tweaked))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{decode_02x, encode_02x};

    #[test]
    /**
        Two leaf script tree example from
        https://github.com/bitcoin-core/btcdeb/blob/master/doc/tapscript-example.md
    */
    fn btcdeb_twoleaf_test() {
        let ctx = Context::new();
        let internal_pk: SchnorrPublicKey = "5bf08d58a430f8c222bffaf9127249c5cdff70a2d68b2b45637eb662b6b88eb5".parse().unwrap();

        let scripts = vec![
            Script::new(decode_02x("029000b275209997a497d964fc1a62885b05a51166a65a90df00492c8d7cf61d6accf54803beac").unwrap()),
            Script::new(decode_02x("a8206c60f404f8167a38fc70eaf8aa17ac351023bef86bcb9d1086a19afe95bd533388204edfcf9dfe6c0b5c83d1ab3f78d1b39a46ebac6798e08e19761f5ed89ec83c10ac").unwrap())
        ];

        let tree = ScriptTree::from_scripts(&scripts).unwrap();
        assert_eq!(encode_02x(&tree.merkle_root()), "41646f8c1fe2a96ddad7f5471bc4fee7da98794ef8c45a4f4fc6a559d60c9f6b");

        let (tweaked_key, _) = output_key(&ctx, &internal_pk, Some(tree.merkle_root())).unwrap();
        assert_eq!(tweaked_key.to_string(), "f128a8a8a636e19f00a80169550fedfc26b6f5dd04d935ec452894aad938ef0c");

        //Child order does not change the root
        let swapped = ScriptTree::branch(ScriptTree::leaf(Leaf::new(&scripts[1])), ScriptTree::leaf(Leaf::new(&scripts[0])));
        assert_eq!(swapped.merkle_root(), tree.merkle_root());
    }

    #[test]
    fn bip86_output_key() {
        let ctx = Context::new();
        let internal: SchnorrPublicKey = "cc8a4bc64d897bddc5fbc2f670f7a8ba0b386779106cf1223c6fc5d7cd6fc115".parse().unwrap();
        let (output, _) = output_key(&ctx, &internal, None).unwrap();
        assert_eq!(output.hex(), "a60869f0dbcf1dc659c9cecbaf8050135ea9e8cdc487053f1dc6880949dc684c");
    }

    #[test]
    /**
        Tweaking a random private key and tweaking its public key must land on the same output key.
    */
    fn key_tweaking_test() {
        let ctx = Context::new();
        let script_tree = ScriptTree::from_scripts(&[Script::new(vec![5, 29, 3])]).unwrap();

        for _ in 0..8 {
            let key = PrivKey::new_rand();
            let internal = key.public_key(&ctx).x_only();
            for root in [None, Some(script_tree.merkle_root())] {
                let tweaked_keypair = tweak_keypair(&ctx, &key, root).unwrap();
                let (tweaked_pub_key, parity) = output_key(&ctx, &internal, root).unwrap();
                assert_eq!(tweaked_keypair.x_only_public_key(), (*tweaked_pub_key.x_only(), parity));
            }
        }
    }

    #[test]
    fn tree_shapes_and_paths() {
        assert_eq!(ScriptTree::from_scripts(&[]), Err(TaprootErr::EmptyTree));

        let scripts: Vec<Script> = (0u8..5).map(|i| Script::new(vec![0x51 + i])).collect();
        let tree = ScriptTree::from_scripts(&scripts).unwrap();
        let leaves: Vec<Leaf> = tree.leaves().into_iter().cloned().collect();
        assert_eq!(leaves.len(), 5);
        assert_eq!(leaves[0].script(), &scripts[0]);

        for leaf in &leaves {
            let path = tree.merkle_path(leaf).unwrap();
            assert!(path.len() <= 3);
            assert!(verify_merkle_path(leaf, &path, tree.merkle_root()));
        }
        assert!(tree.merkle_path(&Leaf::new(&Script::new(vec![0x6a]))).is_none());

        //Single leaf tree
        let single = ScriptTree::from_scripts(&scripts[..1]).unwrap();
        assert!(single.is_leaf());
        assert_eq!(single.merkle_root(), Leaf::new(&scripts[0]).tapleaf_hash());
    }
}
