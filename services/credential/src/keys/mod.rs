//! Key material, rotation and sourcing.

mod algorithm;
mod key;
mod manager;
mod source;

pub use algorithm::SigningAlgorithm;
pub use key::{generate_material, Key, ValidityWindow, ED25519_PUBLIC_KEY_LEN};
pub use manager::{KeyManager, KeySet};
pub use source::{GeneratedKeySource, KeyBundle, KeySource, RetiredKey, StaticKeySource};
