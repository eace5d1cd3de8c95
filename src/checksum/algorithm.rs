//! Checksum algorithms
//!
//! Every algorithm produces its digest as raw bytes; integer digests are
//! big-endian. The algorithm name doubles as the sidecar file suffix, so it
//! must match `^[a-z0-9]+$`.

use std::fmt;
use std::hash::Hasher as _;
use std::sync::OnceLock;

use crc::{Crc, CRC_64_ECMA_182};
use regex::Regex;
use sha2::{Digest as _, Sha256, Sha512};
use twox_hash::XxHash64;

/// CRC-64 calculator (ECMA-182 polynomial)
static CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_ECMA_182);

/// Incremental digest computation
pub trait Digest: Send {
    /// Feed bytes into the digest
    fn update(&mut self, data: &[u8]);

    /// Produce the final digest bytes
    fn finalize(self: Box<Self>) -> Vec<u8>;
}

/// A named checksum algorithm
pub trait ChecksumAlgorithm: Send + Sync + fmt::Debug {
    /// Short identifier, used as the sidecar suffix
    fn name(&self) -> &str;

    /// Start a fresh digest
    fn digest(&self) -> Box<dyn Digest>;
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z0-9]+$").expect("checksum name pattern is valid"))
}

/// Whether `name` is acceptable as an algorithm name
pub fn is_valid_name(name: &str) -> bool {
    name_pattern().is_match(name)
}

/// Algorithms shipped with the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinAlgorithm {
    /// IEEE CRC-32 (default)
    Crc32,
    /// CRC-64/ECMA-182
    Crc64,
    /// 32-bit FNV-1a
    Fnv32a,
    /// 64-bit FNV-1a
    Fnv64a,
    /// 128-bit FNV-1a
    Fnv128a,
    /// XXH64, seed 0
    Xxh64,
    /// SHA-256
    Sha256,
    /// SHA-512
    Sha512,
}

impl BuiltinAlgorithm {
    /// Every built-in algorithm
    pub const ALL: [BuiltinAlgorithm; 8] = [
        BuiltinAlgorithm::Crc32,
        BuiltinAlgorithm::Crc64,
        BuiltinAlgorithm::Fnv32a,
        BuiltinAlgorithm::Fnv64a,
        BuiltinAlgorithm::Fnv128a,
        BuiltinAlgorithm::Xxh64,
        BuiltinAlgorithm::Sha256,
        BuiltinAlgorithm::Sha512,
    ];

    /// The algorithm new stores use unless configured otherwise
    pub const DEFAULT: BuiltinAlgorithm = BuiltinAlgorithm::Crc32;

    pub fn as_str(&self) -> &'static str {
        match self {
            BuiltinAlgorithm::Crc32 => "crc32",
            BuiltinAlgorithm::Crc64 => "crc64",
            BuiltinAlgorithm::Fnv32a => "fnv32a",
            BuiltinAlgorithm::Fnv64a => "fnv64a",
            BuiltinAlgorithm::Fnv128a => "fnv128a",
            BuiltinAlgorithm::Xxh64 => "xxh64",
            BuiltinAlgorithm::Sha256 => "sha256",
            BuiltinAlgorithm::Sha512 => "sha512",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == name)
    }
}

impl ChecksumAlgorithm for BuiltinAlgorithm {
    fn name(&self) -> &str {
        self.as_str()
    }

    fn digest(&self) -> Box<dyn Digest> {
        match self {
            BuiltinAlgorithm::Crc32 => Box::new(Crc32Digest(crc32fast::Hasher::new())),
            BuiltinAlgorithm::Crc64 => Box::new(Crc64Digest(CRC64.digest())),
            BuiltinAlgorithm::Fnv32a => Box::new(Fnv32a(FNV32_OFFSET)),
            BuiltinAlgorithm::Fnv64a => Box::new(Fnv64a(FNV64_OFFSET)),
            BuiltinAlgorithm::Fnv128a => Box::new(Fnv128a(FNV128_OFFSET)),
            BuiltinAlgorithm::Xxh64 => Box::new(Xxh64Digest(XxHash64::with_seed(0))),
            BuiltinAlgorithm::Sha256 => Box::new(Sha256Digest(Sha256::new())),
            BuiltinAlgorithm::Sha512 => Box::new(Sha512Digest(Sha512::new())),
        }
    }
}

impl fmt::Display for BuiltinAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

struct Crc32Digest(crc32fast::Hasher);

impl Digest for Crc32Digest {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        self.0.finalize().to_be_bytes().to_vec()
    }
}

struct Crc64Digest(crc::Digest<'static, u64>);

impl Digest for Crc64Digest {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        self.0.finalize().to_be_bytes().to_vec()
    }
}

const FNV32_OFFSET: u32 = 0x811c_9dc5;
const FNV32_PRIME: u32 = 0x0100_0193;
const FNV64_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV64_PRIME: u64 = 0x0000_0100_0000_01b3;
const FNV128_OFFSET: u128 = 0x6c62_272e_07bb_0142_62b8_2175_6295_c58d;
const FNV128_PRIME: u128 = 0x0000_0000_0100_0000_0000_0000_0000_013b;

struct Fnv32a(u32);

impl Digest for Fnv32a {
    fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.0 ^= u32::from(byte);
            self.0 = self.0.wrapping_mul(FNV32_PRIME);
        }
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        self.0.to_be_bytes().to_vec()
    }
}

struct Fnv64a(u64);

impl Digest for Fnv64a {
    fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.0 ^= u64::from(byte);
            self.0 = self.0.wrapping_mul(FNV64_PRIME);
        }
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        self.0.to_be_bytes().to_vec()
    }
}

struct Fnv128a(u128);

impl Digest for Fnv128a {
    fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.0 ^= u128::from(byte);
            self.0 = self.0.wrapping_mul(FNV128_PRIME);
        }
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        self.0.to_be_bytes().to_vec()
    }
}

struct Xxh64Digest(XxHash64);

impl Digest for Xxh64Digest {
    fn update(&mut self, data: &[u8]) {
        self.0.write(data);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        self.0.finish().to_be_bytes().to_vec()
    }
}

struct Sha256Digest(Sha256);

impl Digest for Sha256Digest {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        self.0.finalize().to_vec()
    }
}

struct Sha512Digest(Sha512);

impl Digest for Sha512Digest {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        self.0.finalize().to_vec()
    }
}
