//! Schema type descriptors
//!
//! A [`Schema`] describes how to interpret a fixed-size region of memory:
//! - [`Kind::Scalar`]: a leaf value (integer, string, ...)
//! - [`Kind::Mapping`]: a struct with an ordered list of [`Field`]s at byte offsets
//! - [`Kind::Sequence`]: a run-time sized array whose count lives elsewhere in the parent
//! - [`Kind::SequenceFixed`]: an array with a fixed element count
//!
//! # Storage
//!
//! Any kind may be stored inline or behind an owned pointer ([`Storage`]).
//! An owned node exclusively owns the block it points to, so whoever walks
//! the schema is responsible for releasing it after its children.
//!
//! # Layout
//!
//! Offsets and sizes are raw byte counts; the schema author accounts for
//! padding. A sequence's `count_offset` is relative to the sequence field
//! itself and may be negative, since the count usually precedes the array:
//!
//! ```text
//! struct { uint32_t n; item_t *items; }   // items: count_offset = -8
//! ```

/// Leaf value kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Int,
    Uint,
    Bool,
    Enum,
    Flags,
    Float,
    String,
    Ignore,
}

/// How a value is held by its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Storage {
    #[default]
    Inline,
    /// The parent holds a pointer to a block this node owns
    Owned,
}

/// One field of a mapping
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub key: String,
    pub value: Schema,
    pub offset: usize,
}

impl Field {
    pub fn new(key: impl Into<String>, offset: usize, value: Schema) -> Self {
        Field {
            key: key.into(),
            value,
            offset,
        }
    }
}

/// Shape of a described value
#[derive(Debug, Clone, PartialEq)]
pub enum Kind {
    Scalar(ScalarKind),
    /// Fields in traversal order
    Mapping(Vec<Field>),
    Sequence {
        element: Box<Schema>,
        /// Offset of the stored count, relative to the sequence's own location
        count_offset: isize,
        /// Byte width of the stored count
        count_width: u8,
    },
    SequenceFixed {
        element: Box<Schema>,
        count: u64,
    },
}

/// A schema node
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub kind: Kind,
    /// Size of the value when stored by value
    pub data_size: usize,
    pub storage: Storage,
}

impl Schema {
    pub fn new(kind: Kind, data_size: usize) -> Self {
        Schema {
            kind,
            data_size,
            storage: Storage::Inline,
        }
    }

    pub fn scalar(kind: ScalarKind, data_size: usize) -> Self {
        Self::new(Kind::Scalar(kind), data_size)
    }

    pub fn int(data_size: usize) -> Self {
        Self::scalar(ScalarKind::Int, data_size)
    }

    pub fn uint(data_size: usize) -> Self {
        Self::scalar(ScalarKind::Uint, data_size)
    }

    pub fn bool(data_size: usize) -> Self {
        Self::scalar(ScalarKind::Bool, data_size)
    }

    pub fn float(data_size: usize) -> Self {
        Self::scalar(ScalarKind::Float, data_size)
    }

    /// A `char *`: an owned, NUL-terminated byte string
    pub fn string() -> Self {
        Self::scalar(ScalarKind::String, 1).owned()
    }

    pub fn mapping(data_size: usize, fields: Vec<Field>) -> Self {
        Self::new(Kind::Mapping(fields), data_size)
    }

    /// Sequence whose element count is stored `count_offset` bytes from the
    /// sequence's own location, `count_width` bytes wide
    pub fn sequence(element: Schema, count_offset: isize, count_width: u8) -> Self {
        let data_size = element.data_size;
        Self::new(
            Kind::Sequence {
                element: Box::new(element),
                count_offset,
                count_width,
            },
            data_size,
        )
    }

    pub fn sequence_fixed(element: Schema, count: u64) -> Self {
        let data_size = element.data_size.saturating_mul(count as usize);
        Self::new(
            Kind::SequenceFixed {
                element: Box::new(element),
                count,
            },
            data_size,
        )
    }

    /// Store this node behind an owned pointer
    pub fn owned(mut self) -> Self {
        self.storage = Storage::Owned;
        self
    }

    /// Store this node by value
    pub fn inline(mut self) -> Self {
        self.storage = Storage::Inline;
        self
    }

    pub fn is_owned(&self) -> bool {
        self.storage == Storage::Owned
    }

    /// Short name of the node's kind, for diagnostics
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            Kind::Scalar(_) => "scalar",
            Kind::Mapping(_) => "mapping",
            Kind::Sequence { .. } => "sequence",
            Kind::SequenceFixed { .. } => "fixed sequence",
        }
    }

    /// Number of mapping/sequence levels, counting this node
    ///
    /// Walking a schema recurses once per level, so this is also the stack
    /// depth a free pass needs.
    pub fn nesting_depth(&self) -> usize {
        match &self.kind {
            Kind::Scalar(_) => 1,
            Kind::Mapping(fields) => {
                1 + fields
                    .iter()
                    .map(|f| f.value.nesting_depth())
                    .max()
                    .unwrap_or(0)
            }
            Kind::Sequence { element, .. } | Kind::SequenceFixed { element, .. } => {
                1 + element.nesting_depth()
            }
        }
    }
}
