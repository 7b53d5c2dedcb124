//! Decode access descriptors into per-resource privileges.
//!
//! Identity backends describe what a user can do with a compact string:
//!
//! ```text
//! <namespace>:<resource>:<privilege>;<namespace>:<resource>:<privilege>;...
//! ```
//!
//! The namespace field is not used but must be present.
//! A single malformed record invalidates the whole descriptor.
use std::collections::HashMap;
use std::fmt;
use std::ops::BitOr;

/// Separator between records in an access descriptor.
pub const RECORD_SEPARATOR: char = ';';

/// Separator between fields of an access descriptor record.
pub const FIELD_SEPARATOR: char = ':';

/// Number of fields each access descriptor record must have.
const RECORD_FIELDS: usize = 3;

/// Privileges granted to a user, keyed by resource name.
pub type Access = HashMap<String, Priv>;

/// Registry privilege over a resource.
///
/// Privileges are a small bitset so that combined grants can be checked with [`Priv::has`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Priv(u8);

impl Priv {
    /// Push images to the resource.
    pub const PUSH: Priv = Priv(1);

    /// Pull images from the resource (read-only access).
    pub const PULL: Priv = Priv(2);

    /// Push and pull (read-write access).
    pub const ALL: Priv = Priv(3);

    /// Privilege decoded from an unknown code; grants nothing.
    pub const ILLEGAL: Priv = Priv(4);

    /// Decode a privilege code.
    ///
    /// | Code                                   | Privilege        |
    /// |----------------------------------------|------------------|
    /// | `r`, `pull`                            | [`Priv::PULL`]   |
    /// | `w`, `push`                            | [`Priv::PUSH`]   |
    /// | `rw`, `wr`, `push,pull`, `pull,push`, `*` | [`Priv::ALL`] |
    /// | anything else                          | [`Priv::ILLEGAL`] |
    pub fn new(code: &str) -> Priv {
        match code {
            "r" | "pull" => Priv::PULL,
            "w" | "push" => Priv::PUSH,
            "rw" | "wr" | "push,pull" | "pull,push" | "*" => Priv::ALL,
            _ => Priv::ILLEGAL,
        }
    }

    /// Registry actions granted by this privilege.
    pub fn actions(self) -> Vec<&'static str> {
        let mut actions = Vec::new();
        if self.has(Priv::PULL) {
            actions.push("pull");
        }
        if self.has(Priv::PUSH) {
            actions.push("push");
        }
        actions
    }

    /// Check if this privilege includes all of `other`.
    ///
    /// Illegal privileges never grant, nor are granted by, anything.
    pub fn has(self, other: Priv) -> bool {
        self.is_valid() && other.is_valid() && self.0 & other.0 == other.0
    }

    /// Check if the privilege was decoded from a known code.
    pub fn is_valid(self) -> bool {
        Priv::PUSH.0 <= self.0 && self.0 < Priv::ILLEGAL.0
    }

    /// Privilege needed to perform a registry action, if the action is known.
    pub fn for_action(action: &str) -> Option<Priv> {
        match action {
            "pull" => Some(Priv::PULL),
            "push" => Some(Priv::PUSH),
            "*" => Some(Priv::ALL),
            _ => None,
        }
    }
}

impl BitOr for Priv {
    type Output = Priv;

    fn bitor(self, rhs: Self) -> Self::Output {
        if !self.is_valid() || !rhs.is_valid() {
            return Priv::ILLEGAL;
        }
        Priv(self.0 | rhs.0)
    }
}

impl fmt::Display for Priv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if !self.is_valid() {
            return write!(f, "illegal");
        }
        write!(f, "{}", self.actions().join(","))
    }
}

/// A record in an access descriptor does not have the expected structure.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("access descriptor record {index} has {fields} fields instead of 3")]
pub struct AccessParseError {
    /// Number of fields found in the record.
    pub fields: usize,

    /// Position of the malformed record in the descriptor, starting at 0.
    pub index: usize,

    /// The malformed record, as found in the descriptor.
    pub record: String,
}

/// Parse an access descriptor into an [`Access`] map.
///
/// Records are separated by [`RECORD_SEPARATOR`] and must have exactly three fields separated
/// by [`FIELD_SEPARATOR`]: namespace, resource and privilege code.
///
/// - Any malformed record fails the entire parse, no partial map is ever returned.
///   This includes empty descriptors and empty records (such as trailing separators).
/// - When a resource appears more than once the last record wins.
/// - Unknown privilege codes decode to [`Priv::ILLEGAL`] and are not an error.
pub fn parse_access(descriptor: &str) -> Result<Access, AccessParseError> {
    let mut access = Access::new();
    for (index, record) in descriptor.split(RECORD_SEPARATOR).enumerate() {
        let fields: Vec<&str> = record.split(FIELD_SEPARATOR).collect();
        if fields.len() != RECORD_FIELDS {
            return Err(AccessParseError {
                fields: fields.len(),
                index,
                record: record.to_string(),
            });
        }
        access.insert(fields[1].to_string(), Priv::new(fields[2]));
    }
    Ok(access)
}
