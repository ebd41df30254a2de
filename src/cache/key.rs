//! Key Builder Module
//!
//! Canonical serialization of call signatures and their fixed-size digests.
//!
//! # Canonical form (v1)
//! - `null`, `true`, `false`
//! - integers as `i<n>`, unsigned integers above `i64::MAX` as `u<n>`, floats as `f<debug repr>`
//! - strings as `s<byte-len>:<raw>`, bytes as `x<byte-len>:<hex>`
//! - lists as `[a,b]`, maps as `{k:v}` with keys sorted
//! - callables as `fn#<id>` and symbols as `sym#<id>`, each followed by the label
//!
//! A full key is `v1;<type>;<method>;[<args>]`.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest as _, Sha256};

/// Version tag prefixed to every canonical key.
pub const CANONICAL_VERSION: &str = "v1";

static NEXT_IDENTITY: AtomicU64 = AtomicU64::new(1);

// == Identity ==
/// Opaque identity token standing in for a callable or a unique symbol.
///
/// Clones compare equal; two tokens created separately never do, even with the same label.
#[derive(Debug, Clone)]
pub struct Identity {
    id: u64,
    label: Arc<str>,
}

impl Identity {
    pub fn new(label: impl Into<Arc<str>>) -> Self {
        Self {
            id: NEXT_IDENTITY.fetch_add(1, Ordering::Relaxed),
            label: label.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Identity {}

// == Arg ==
/// A call argument as seen by the key builder and the collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Null,
    Bool(bool),
    Int(i64),
    /// Unsigned integer too large for `Int`
    UInt(u64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Arg>),
    Map(BTreeMap<String, Arg>),
    Callable(Identity),
    Symbol(Identity),
}

impl Arg {
    /// Creates a fresh callable token.
    pub fn callable(label: impl Into<Arc<str>>) -> Self {
        Arg::Callable(Identity::new(label))
    }

    /// Creates a fresh symbol token.
    pub fn symbol(label: impl Into<Arc<str>>) -> Self {
        Arg::Symbol(Identity::new(label))
    }

    /// Builds a map argument from key/value pairs.
    pub fn map<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Arg>,
    {
        Arg::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Arg::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Arg::Int(n) => u64::try_from(*n).ok(),
            Arg::UInt(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Arg::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Arg::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Arg]> {
        match self {
            Arg::List(items) => Some(items),
            _ => None,
        }
    }

    /// Looks up a field of a map argument.
    pub fn get(&self, key: &str) -> Option<&Arg> {
        match self {
            Arg::Map(fields) => fields.get(key),
            _ => None,
        }
    }

    /// Returns the v1 canonical text for this value alone.
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        write_canonical(&mut out, vec![Frame::Value(self)]);
        out
    }
}

impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Arg::Bool(value)
    }
}

impl From<i32> for Arg {
    fn from(value: i32) -> Self {
        Arg::Int(value.into())
    }
}

impl From<u32> for Arg {
    fn from(value: u32) -> Self {
        Arg::Int(value.into())
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Arg::Int(value)
    }
}

/// Values that fit an `i64` become `Int`, so equal numbers share a key.
impl From<u64> for Arg {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(Arg::UInt(value), Arg::Int)
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Self {
        Arg::Float(value)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Str(value.to_string())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Str(value)
    }
}

impl<T: Into<Arg>> From<Vec<T>> for Arg {
    fn from(values: Vec<T>) -> Self {
        Arg::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Arg>> From<Option<T>> for Arg {
    fn from(value: Option<T>) -> Self {
        value.map_or(Arg::Null, Into::into)
    }
}

impl From<serde_json::Value> for Arg {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Arg::Null,
            Value::Bool(b) => Arg::Bool(b),
            Value::Number(n) => match (n.as_i64(), n.as_u64()) {
                (Some(i), _) => Arg::Int(i),
                (None, Some(u)) => Arg::UInt(u),
                (None, None) => Arg::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Arg::Str(s),
            Value::Array(items) => Arg::List(items.into_iter().map(Arg::from).collect()),
            Value::Object(fields) => {
                Arg::Map(fields.into_iter().map(|(k, v)| (k, Arg::from(v))).collect())
            }
        }
    }
}

// == Canonical Writer ==
enum Frame<'a> {
    Value(&'a Arg),
    Key(&'a str),
    Text(&'static str),
}

/// Pushes a list's frames so they pop in order.
fn push_list<'a>(stack: &mut Vec<Frame<'a>>, items: &'a [Arg]) {
    stack.push(Frame::Text("]"));
    for (i, item) in items.iter().enumerate().rev() {
        stack.push(Frame::Value(item));
        if i > 0 {
            stack.push(Frame::Text(","));
        }
    }
    stack.push(Frame::Text("["));
}

fn push_map<'a>(stack: &mut Vec<Frame<'a>>, fields: &'a BTreeMap<String, Arg>) {
    stack.push(Frame::Text("}"));
    for (i, (key, value)) in fields.iter().enumerate().rev() {
        stack.push(Frame::Value(value));
        stack.push(Frame::Key(key));
        if i > 0 {
            stack.push(Frame::Text(","));
        }
    }
    stack.push(Frame::Text("{"));
}

fn write_str(out: &mut String, s: &str) {
    let _ = write!(out, "s{}:{}", s.len(), s);
}

// Iterative so nesting depth is bounded by the heap, not the call stack.
fn write_canonical<'a>(out: &mut String, mut stack: Vec<Frame<'a>>) {
    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Text(text) => out.push_str(text),
            Frame::Key(key) => {
                write_str(out, key);
                out.push(':');
            }
            Frame::Value(value) => match value {
                Arg::Null => out.push_str("null"),
                Arg::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
                Arg::Int(n) => {
                    let _ = write!(out, "i{}", n);
                }
                Arg::UInt(n) => {
                    let _ = write!(out, "u{}", n);
                }
                Arg::Float(f) => {
                    let _ = write!(out, "f{:?}", f);
                }
                Arg::Str(s) => write_str(out, s),
                Arg::Bytes(bytes) => {
                    let _ = write!(out, "x{}:", bytes.len());
                    for b in bytes {
                        let _ = write!(out, "{:02x}", b);
                    }
                }
                Arg::List(items) => push_list(&mut stack, items),
                Arg::Map(fields) => push_map(&mut stack, fields),
                Arg::Callable(identity) => {
                    let _ = write!(out, "fn#{}", identity.id);
                    write_str(out, &identity.label);
                }
                Arg::Symbol(identity) => {
                    let _ = write!(out, "sym#{}", identity.id);
                    write_str(out, &identity.label);
                }
            },
        }
    }
}

// == Digest ==
/// Fixed-size hex digest identifying one call signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    pub fn of(canonical: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Digest(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// == Cache Key ==
/// A call signature in canonical text form plus its digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheKey {
    pub canonical: String,
    pub digest: Digest,
}

// == Key Builder ==
/// Builds cache keys from `(type, method, args)` triples.
pub struct KeyBuilder;

impl KeyBuilder {
    pub fn build(type_name: &str, method: &str, args: &[Arg]) -> CacheKey {
        let canonical = Self::canonical(type_name, method, args);
        let digest = Digest::of(&canonical);
        CacheKey { canonical, digest }
    }

    pub fn canonical(type_name: &str, method: &str, args: &[Arg]) -> String {
        let mut out = String::from(CANONICAL_VERSION);
        out.push(';');
        write_str(&mut out, type_name);
        out.push(';');
        write_str(&mut out, method);
        out.push(';');

        let mut stack = Vec::new();
        push_list(&mut stack, args);
        write_canonical(&mut out, stack);
        out
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_primitives() {
        assert_eq!(Arg::Null.canonical(), "null");
        assert_eq!(Arg::Bool(true).canonical(), "true");
        assert_eq!(Arg::Int(-7).canonical(), "i-7");
        assert_eq!(Arg::Float(1.5).canonical(), "f1.5");
        assert_eq!(Arg::from("ab").canonical(), "s2:ab");
        assert_eq!(Arg::Bytes(vec![0, 255]).canonical(), "x2:00ff");
    }

    #[test]
    fn test_canonical_nested() {
        let arg = Arg::map([("where", Arg::map([("id", 1)])), ("limit", Arg::from(10))]);
        assert_eq!(arg.canonical(), "{s5:limit:i10,s5:where:{s2:id:i1}}");
    }

    #[test]
    fn test_build_key_layout() {
        let key = KeyBuilder::build("users", "find_by_id", &[Arg::from(1)]);
        assert_eq!(key.canonical, "v1;s5:users;s10:find_by_id;[i1]");
        assert_eq!(key.digest.as_str().len(), 64);
    }

    #[test]
    fn test_equal_args_same_digest() {
        let a = KeyBuilder::build("users", "find_one", &[Arg::from(json!({"where": {"name": "ann"}}))]);
        let b = KeyBuilder::build("users", "find_one", &[Arg::from(json!({"where": {"name": "ann"}}))]);
        assert_eq!(a.digest, b.digest);
    }

    #[test]
    fn test_map_insertion_order_ignored() {
        let a = Arg::map([("a", 1), ("b", 2)]);
        let b = Arg::map([("b", 2), ("a", 1)]);
        assert_eq!(
            KeyBuilder::build("t", "m", &[a]).digest,
            KeyBuilder::build("t", "m", &[b]).digest
        );
    }

    #[test]
    fn test_type_and_method_are_part_of_key() {
        let args = [Arg::from(1)];
        let base = KeyBuilder::build("users", "find_by_id", &args);
        assert_ne!(base.digest, KeyBuilder::build("posts", "find_by_id", &args).digest);
        assert_ne!(base.digest, KeyBuilder::build("users", "count", &args).digest);
    }

    #[test]
    fn test_length_prefix_prevents_ambiguity() {
        let a = KeyBuilder::build("t", "m", &[Arg::from("a,s1:b")]);
        let b = KeyBuilder::build("t", "m", &[Arg::from("a"), Arg::from("b")]);
        assert_ne!(a.canonical, b.canonical);
    }

    #[test]
    fn test_int_and_float_differ() {
        assert_ne!(Arg::Int(1).canonical(), Arg::Float(1.0).canonical());
    }

    #[test]
    fn test_identity_tokens() {
        let gt = Arg::symbol("gt");
        let same = gt.clone();
        let other = Arg::symbol("gt");

        let k1 = KeyBuilder::build("t", "find_all", &[gt]);
        let k2 = KeyBuilder::build("t", "find_all", &[same]);
        let k3 = KeyBuilder::build("t", "find_all", &[other]);

        assert_eq!(k1.digest, k2.digest);
        assert_ne!(k1.digest, k3.digest);
    }

    #[test]
    fn test_callable_and_symbol_differ() {
        let identity = Identity::new("f");
        assert_ne!(
            Arg::Callable(identity.clone()).canonical(),
            Arg::Symbol(identity).canonical()
        );
    }

    #[test]
    fn test_deep_nesting_does_not_overflow() {
        let mut arg = Arg::Null;
        for _ in 0..100_000 {
            arg = Arg::List(vec![arg]);
        }
        let key = KeyBuilder::build("t", "m", std::slice::from_ref(&arg));
        assert!(key.canonical.len() > 200_000);

        // iterative drop keeps the test from overflowing on teardown
        let mut current = arg;
        while let Arg::List(mut items) = current {
            current = items.pop().unwrap_or(Arg::Null);
        }
    }

    #[test]
    fn test_from_json_numbers() {
        assert_eq!(Arg::from(json!(3)), Arg::Int(3));
        assert_eq!(Arg::from(json!(2.5)), Arg::Float(2.5));
        assert_eq!(Arg::from(json!(u64::MAX)), Arg::UInt(u64::MAX));
        assert_eq!(Arg::from(Option::<i64>::None), Arg::Null);
    }

    #[test]
    fn test_large_unsigned_ids_keep_distinct_keys() {
        let a = KeyBuilder::build("users", "find", &[Arg::from(json!(u64::MAX))]);
        let b = KeyBuilder::build("users", "find", &[Arg::from(json!(u64::MAX - 1))]);

        assert_eq!(a.canonical, "v1;s5:users;s4:find;[u18446744073709551615]");
        assert_ne!(a.canonical, b.canonical);
        assert_ne!(a.digest, b.digest);
    }

    #[test]
    fn test_from_u64_matches_signed_when_in_range() {
        assert_eq!(Arg::from(7u64), Arg::from(7));
        assert_eq!(Arg::from(7u64).canonical(), Arg::from(json!(7)).canonical());
        assert_eq!(Arg::from(u64::MAX).as_u64(), Some(u64::MAX));
        assert_eq!(Arg::from(-1).as_u64(), None);
    }

    #[test]
    fn test_accessors() {
        let query = Arg::from(json!({"active": true, "ids": [1, 2]}));

        assert_eq!(query.get("active").and_then(Arg::as_bool), Some(true));
        let ids: Vec<i64> = query
            .get("ids")
            .and_then(Arg::as_list)
            .map(|items| items.iter().filter_map(Arg::as_i64).collect())
            .unwrap_or_default();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(query.get("missing"), None);
        assert_eq!(Arg::from("ann").as_str(), Some("ann"));
    }
}
