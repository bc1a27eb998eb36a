/// Column metadata: declared type, constraint flags and default value
use crate::error::Result;
use crate::types::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Declared column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    Integer,
    Text,
    Real,
    /// No affinity (BLOB or undeclared)
    None,
    Numeric,
}

impl TypeTag {
    pub fn name(&self) -> &'static str {
        match self {
            TypeTag::Integer => "INTEGER",
            TypeTag::Text => "TEXT",
            TypeTag::Real => "REAL",
            TypeTag::None => "NONE",
            TypeTag::Numeric => "NUMERIC",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Column constraint flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnFlags(u16);

impl ColumnFlags {
    pub const EMPTY: ColumnFlags = ColumnFlags(0);
    pub const NOT_NULL: ColumnFlags = ColumnFlags(0x0100);
    pub const PRIMARY_KEY: ColumnFlags = ColumnFlags(0x0200);
    pub const AUTO_INCREMENT: ColumnFlags = ColumnFlags(0x0400);

    pub fn contains(&self, other: ColumnFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn bits(&self) -> u16 {
        self.0
    }
}

impl BitOr for ColumnFlags {
    type Output = ColumnFlags;

    fn bitor(self, rhs: ColumnFlags) -> ColumnFlags {
        ColumnFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for ColumnFlags {
    fn bitor_assign(&mut self, rhs: ColumnFlags) {
        self.0 |= rhs.0;
    }
}

/// Column definition
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name (not required to be unique; lookups use the first match)
    pub name: String,
    pub type_tag: TypeTag,
    pub flags: ColumnFlags,
    /// Default value, already coerced to `type_tag`
    pub default: Value,
    next_auto: i64,
}

impl Column {
    pub fn new(name: impl Into<String>, type_tag: TypeTag) -> Self {
        Self {
            name: name.into(),
            type_tag,
            flags: ColumnFlags::EMPTY,
            default: Value::Null,
            next_auto: 0,
        }
    }

    pub fn with_flags(mut self, flags: ColumnFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Sets the default, coercing it to the column type.
    pub fn with_default(mut self, default: Value) -> Result<Self> {
        self.default = default.coerce(self.type_tag)?;
        Ok(self)
    }

    pub fn is_not_null(&self) -> bool {
        self.flags.contains(ColumnFlags::NOT_NULL)
    }

    pub fn is_primary_key(&self) -> bool {
        self.flags.contains(ColumnFlags::PRIMARY_KEY)
    }

    pub fn is_auto_increment(&self) -> bool {
        self.flags.contains(ColumnFlags::AUTO_INCREMENT)
    }

    /// Same definition with the auto-increment counter reset.
    pub(crate) fn fresh_copy(&self) -> Column {
        Column {
            next_auto: 0,
            ..self.clone()
        }
    }

    /// Returns the next auto-increment value and advances the counter.
    pub(crate) fn take_auto_value(&mut self) -> i64 {
        let value = self.next_auto;
        self.next_auto += 1;
        value
    }
}
