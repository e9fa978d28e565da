//! # Key derivation
//!
//! Turns an invocation (function identifier plus arguments) into a
//! [`CacheKey`].
//!
//! The invocation is first serialized into a [`CanonicalForm`]: a prefix-free
//! byte encoding in which every value starts with a type tag and every
//! variable-length field (strings, sequences, maps, argument lists) carries
//! its length up front. Argument boundaries therefore can never be confused:
//! `["a,b"]` and `["a", "b"]` encode to different bytes. Keyword arguments
//! and map entries are sorted before encoding so construction order never
//! changes the result.
//!
//! The canonical bytes are then hashed with SHA-256.

use crate::error::{KeyError, Result};
use crate::value::{ArgValue, Args};
use sha2::{Digest, Sha256};
use std::fmt;

const FORMAT_HEADER: &[u8] = b"memoist/key/v1";
const KEY_LEN: usize = 32;

const TAG_NULL: u8 = 0x00;
const TAG_FALSE: u8 = 0x01;
const TAG_TRUE: u8 = 0x02;
const TAG_INT: u8 = 0x03;
const TAG_FLOAT: u8 = 0x04;
const TAG_STR: u8 = 0x05;
const TAG_SEQ: u8 = 0x06;
const TAG_MAP: u8 = 0x07;

/// Fixed-length (256-bit) digest identifying one invocation.
///
/// # Examples
///
/// ```
/// use memoist_core::{ArgValue, KeyDeriver};
///
/// let deriver = KeyDeriver::new();
/// let key = deriver.derive("add", &[1.into(), 2.into()], &[]).unwrap();
/// assert_eq!(key.to_hex().len(), 64);
/// assert_eq!(key, deriver.derive("add", &[1.into(), 2.into()], &[]).unwrap());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey([u8; KEY_LEN]);

impl CacheKey {
    /// Digest length in bytes.
    pub const LEN: usize = KEY_LEN;

    pub const fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    /// Lower-case hex encoding (64 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a key previously produced by [`CacheKey::to_hex`].
    pub fn from_hex(s: &str) -> Option<Self> {
        let mut bytes = [0u8; Self::LEN];
        hex::decode_to_slice(s, &mut bytes).ok()?;
        Some(Self(bytes))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey({}..)", hex::encode(&self.0[..6]))
    }
}

/// The canonical byte serialization of an invocation, i.e. the hash input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalForm(Vec<u8>);

impl CanonicalForm {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Hashes the canonical bytes into a [`CacheKey`].
    pub fn digest(&self) -> CacheKey {
        let digest = Sha256::digest(&self.0);
        let mut bytes = [0u8; CacheKey::LEN];
        bytes.copy_from_slice(&digest);
        CacheKey(bytes)
    }
}

/// Derives cache keys from invocations.
///
/// A deriver is a pure function of its inputs. An optional namespace is mixed
/// into every key, so derivers with different namespaces never produce the
/// same key for the same invocation.
///
/// # Examples
///
/// ```
/// use memoist_core::{ArgValue, KeyDeriver, KeyError};
///
/// let deriver = KeyDeriver::new();
///
/// // Keyword order at the call site does not matter
/// let a = deriver
///     .derive("f", &[], &[("x".into(), 1.into()), ("y".into(), 2.into())])
///     .unwrap();
/// let b = deriver
///     .derive("f", &[], &[("y".into(), 2.into()), ("x".into(), 1.into())])
///     .unwrap();
/// assert_eq!(a, b);
///
/// // Values without a stable representation are rejected
/// let err = deriver
///     .derive("f", &[ArgValue::opaque::<std::fs::File>()], &[])
///     .unwrap_err();
/// assert!(matches!(err, KeyError::UnsupportedArgumentType { .. }));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyDeriver {
    namespace: String,
}

impl KeyDeriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Derives the cache key of an invocation.
    ///
    /// # Errors
    ///
    /// * [`KeyError::EmptyFunctionId`] if `function_id` is empty
    /// * [`KeyError::UnsupportedArgumentType`] if any value, at any depth, is
    ///   a set or an opaque value
    /// * [`KeyError::DuplicateKey`] if a keyword name or a map key repeats
    pub fn derive(
        &self,
        function_id: &str,
        positional: &[ArgValue],
        keyword: &[(String, ArgValue)],
    ) -> Result<CacheKey> {
        self.canonical_form(function_id, positional, keyword)
            .map(|form| form.digest())
    }

    /// Derives the cache key for a captured [`Args`] list.
    pub fn derive_args(&self, function_id: &str, args: &Args) -> Result<CacheKey> {
        self.derive(function_id, args.positional_values(), args.keyword_values())
    }

    /// Builds the canonical serialization without hashing it.
    pub fn canonical_form(
        &self,
        function_id: &str,
        positional: &[ArgValue],
        keyword: &[(String, ArgValue)],
    ) -> Result<CanonicalForm> {
        if function_id.is_empty() {
            return Err(KeyError::EmptyFunctionId);
        }

        let mut enc = Encoder::default();
        enc.buf.extend_from_slice(FORMAT_HEADER);
        enc.bytes(self.namespace.as_bytes());
        enc.bytes(function_id.as_bytes());

        let mut path = String::from("args");
        enc.count(positional.len());
        for (i, value) in positional.iter().enumerate() {
            with_segment(&mut path, &format!("[{i}]"), |path| enc.value(value, path))?;
        }

        let mut sorted: Vec<&(String, ArgValue)> = keyword.iter().collect();
        sorted.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
        if let Some(dup) = sorted.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(KeyError::DuplicateKey {
                path: format!("kwargs.{}", dup[0].0),
            });
        }

        let mut path = String::from("kwargs");
        enc.count(sorted.len());
        for (name, value) in sorted {
            enc.bytes(name.as_bytes());
            with_segment(&mut path, &format!(".{name}"), |path| enc.value(value, path))?;
        }

        Ok(CanonicalForm(enc.buf))
    }
}

/// Runs `f` with `segment` appended to `path`, restoring it afterwards.
fn with_segment<T>(path: &mut String, segment: &str, f: impl FnOnce(&mut String) -> T) -> T {
    let len = path.len();
    path.push_str(segment);
    let out = f(path);
    path.truncate(len);
    out
}

/// Maps every NaN to one bit pattern and `-0.0` to `0.0`.
fn canonical_float_bits(f: f64) -> u64 {
    if f.is_nan() {
        f64::NAN.to_bits()
    } else if f == 0.0 {
        0
    } else {
        f.to_bits()
    }
}

#[derive(Default)]
struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    fn count(&mut self, n: usize) {
        self.buf.extend_from_slice(&(n as u64).to_be_bytes());
    }

    fn bytes(&mut self, bytes: &[u8]) {
        self.count(bytes.len());
        self.buf.extend_from_slice(bytes);
    }

    fn value(&mut self, value: &ArgValue, path: &mut String) -> Result<()> {
        match value {
            ArgValue::Null => self.buf.push(TAG_NULL),
            ArgValue::Bool(false) => self.buf.push(TAG_FALSE),
            ArgValue::Bool(true) => self.buf.push(TAG_TRUE),
            ArgValue::Int(i) => {
                self.buf.push(TAG_INT);
                self.buf.extend_from_slice(&i.to_be_bytes());
            }
            ArgValue::Float(f) => {
                self.buf.push(TAG_FLOAT);
                self.buf
                    .extend_from_slice(&canonical_float_bits(*f).to_be_bytes());
            }
            ArgValue::Str(s) => {
                self.buf.push(TAG_STR);
                self.bytes(s.as_bytes());
            }
            ArgValue::Seq(items) => {
                self.buf.push(TAG_SEQ);
                self.count(items.len());
                for (i, item) in items.iter().enumerate() {
                    with_segment(path, &format!("[{i}]"), |path| self.value(item, path))?;
                }
            }
            ArgValue::Map(entries) => {
                self.buf.push(TAG_MAP);
                self.map(entries, path)?;
            }
            ArgValue::Set(_) | ArgValue::Opaque(_) => {
                return Err(KeyError::UnsupportedArgumentType {
                    path: path.clone(),
                    type_name: value.type_name(),
                });
            }
        }
        Ok(())
    }

    /// Map entries are encoded separately, then ordered by the canonical
    /// bytes of their keys.
    fn map(&mut self, entries: &[(ArgValue, ArgValue)], path: &mut String) -> Result<()> {
        let mut encoded = Vec::with_capacity(entries.len());
        for (i, (k, v)) in entries.iter().enumerate() {
            let mut key_enc = Encoder::default();
            with_segment(path, &format!(".keys[{i}]"), |path| key_enc.value(k, path))?;
            let mut value_enc = Encoder::default();
            with_segment(path, &format!(".values[{i}]"), |path| value_enc.value(v, path))?;
            encoded.push((i, key_enc.buf, value_enc.buf));
        }

        encoded.sort_by(|a, b| a.1.cmp(&b.1));
        if let Some(dup) = encoded.windows(2).find(|w| w[0].1 == w[1].1) {
            return Err(KeyError::DuplicateKey {
                path: format!("{path}.keys[{}]", dup[0].0.max(dup[1].0)),
            });
        }

        self.count(encoded.len());
        for (_, key, value) in encoded {
            self.buf.extend_from_slice(&key);
            self.buf.extend_from_slice(&value);
        }
        Ok(())
    }
}
