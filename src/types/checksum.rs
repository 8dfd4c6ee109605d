use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256, Sha512};
use std::{fmt::Display, fs::File, io, path::Path};

/// Checksum of a package file, as declared by the repository index
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Checksum {
    Sha256(Vec<u8>),
    Sha512(Vec<u8>),
}

impl Checksum {
    pub fn from_sha256_str(s: &str) -> Result<Self> {
        if s.len() != 64 {
            bail!("malformed SHA256 string: bad length")
        }
        Ok(Checksum::Sha256(hex::decode(s)?))
    }

    pub fn from_sha512_str(s: &str) -> Result<Self> {
        if s.len() != 128 {
            bail!("malformed SHA512 string: bad length")
        }
        Ok(Checksum::Sha512(hex::decode(s)?))
    }

    /// SHA256 of everything `r` yields
    pub fn sha256_of_reader(mut r: impl io::Read) -> Result<Self> {
        let mut hasher = Sha256::new();
        io::copy(&mut r, &mut hasher)?;
        Ok(Checksum::Sha256(hasher.finalize().to_vec()))
    }

    pub fn sha256_of_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open {} for checksum", path.display()))?;
        Checksum::sha256_of_reader(file)
    }

    pub fn matches_reader(&self, mut r: impl io::Read) -> Result<bool> {
        let hash = match self {
            Checksum::Sha256(_) => {
                let mut hasher = Sha256::new();
                io::copy(&mut r, &mut hasher)?;
                hasher.finalize().to_vec()
            }
            Checksum::Sha512(_) => {
                let mut hasher = Sha512::new();
                io::copy(&mut r, &mut hasher)?;
                hasher.finalize().to_vec()
            }
        };
        Ok(self.digest() == hash.as_slice())
    }

    pub fn matches_file(&self, path: &Path) -> Result<bool> {
        let file = File::open(path)
            .with_context(|| format!("failed to open {} for checksum", path.display()))?;
        self.matches_reader(file)
    }

    fn digest(&self) -> &[u8] {
        match self {
            Checksum::Sha256(d) | Checksum::Sha512(d) => d,
        }
    }
}

impl Display for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Checksum::Sha256(hex) => {
                f.write_str("sha256::")?;
                f.write_str(&hex::encode(hex))
            }
            Checksum::Sha512(hex) => {
                f.write_str("sha512::")?;
                f.write_str(&hex::encode(hex))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // sha256("hello\n")
    const HELLO_SHA256: &str = "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03";

    #[test]
    fn check_reader() {
        let sum = Checksum::from_sha256_str(HELLO_SHA256).unwrap();
        assert!(sum.matches_reader(&b"hello\n"[..]).unwrap());
        assert!(!sum.matches_reader(&b"hello"[..]).unwrap());
        assert_eq!(sum.to_string(), format!("sha256::{HELLO_SHA256}"));
    }

    #[test]
    fn compute() {
        let sum = Checksum::sha256_of_reader(&b"hello\n"[..]).unwrap();
        assert_eq!(sum, Checksum::from_sha256_str(HELLO_SHA256).unwrap());
    }

    #[test]
    fn bad_length() {
        assert!(Checksum::from_sha256_str("abcd").is_err());
        assert!(Checksum::from_sha512_str(HELLO_SHA256).is_err());
    }
}
