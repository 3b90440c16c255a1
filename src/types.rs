//! Type-side descriptions of runtime objects.
//!
//! These are pure descriptions used for link-time compatibility checks; they
//! are never themselves live objects. The compatibility rules live in
//! [`Store::is_a`](crate::Store::is_a).

use crate::values::ValType;
use more_asserts::assert_le;
use std::fmt;

/// Size bounds of a table or memory, in elements or pages.
///
/// An absent maximum means the bound is unspecified, i.e. unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    min: u64,
    max: Option<u64>,
}

impl Limits {
    /// Creates a new set of limits with the given minimum and optional
    /// maximum.
    pub fn new(min: u64, max: Option<u64>) -> Limits {
        if let Some(max) = max {
            assert_le!(min, max, "limits minimum exceeds maximum");
        }
        Limits { min, max }
    }

    /// Creates limits with a minimum only; the maximum is unbounded.
    pub fn at_least(min: u64) -> Limits {
        Limits { min, max: None }
    }

    /// Returns the minimum bound.
    pub fn min(&self) -> u64 {
        self.min
    }

    /// Returns the maximum bound, if one was declared.
    pub fn max(&self) -> Option<u64> {
        self.max
    }

    /// Returns whether the range described by `self` is contained within the
    /// range described by `required`.
    ///
    /// An object with narrower declared bounds may safely stand in for a
    /// request with wider bounds, so this is the comparison used when linking
    /// a concrete table or memory against a required type. An unspecified
    /// required maximum admits any object; an unspecified object maximum only
    /// fits an unspecified required maximum.
    pub fn is_subset_of(&self, required: &Limits) -> bool {
        if self.min < required.min {
            return false;
        }
        match (self.max, required.max) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(own), Some(required)) => own <= required,
        }
    }
}

/// Whether a global may be mutated after initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability {
    /// The global is immutable.
    Const,
    /// The global is mutable.
    Var,
}

/// The element type of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefType {
    /// A reference to a function.
    FuncRef,
}

/// The signature of a function: ordered parameter types and an optional
/// result type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncType {
    params: Box<[ValType]>,
    result: Option<ValType>,
}

impl FuncType {
    /// Creates a new function signature.
    pub fn new(params: Box<[ValType]>, result: Option<ValType>) -> FuncType {
        FuncType { params, result }
    }

    /// Returns the parameter types, in order.
    pub fn params(&self) -> &[ValType] {
        &self.params
    }

    /// Returns the result type, or `None` for a void-returning function.
    pub fn result(&self) -> Option<ValType> {
        self.result
    }

    /// Returns the number of 64-bit cells an invoke thunk's argument buffer
    /// needs for this signature: one per parameter plus one for a non-void
    /// result.
    pub fn cell_count(&self) -> usize {
        self.params.len() + self.result.map_or(0, |_| 1)
    }
}

impl fmt::Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, ")")?;
        if let Some(result) = self.result {
            write!(f, " -> {}", result)?;
        }
        Ok(())
    }
}

/// The type of a global: its content type and mutability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalType {
    content: ValType,
    mutability: Mutability,
}

impl GlobalType {
    /// Creates a new global type.
    pub fn new(content: ValType, mutability: Mutability) -> GlobalType {
        GlobalType {
            content,
            mutability,
        }
    }

    /// Returns the content type.
    pub fn content(&self) -> ValType {
        self.content
    }

    /// Returns the mutability.
    pub fn mutability(&self) -> Mutability {
        self.mutability
    }

    /// Returns whether values of this type may be written after
    /// initialization.
    pub fn is_mutable(&self) -> bool {
        self.mutability == Mutability::Var
    }
}

/// The type of a table: its element type and size bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableType {
    element: RefType,
    limits: Limits,
}

impl TableType {
    /// Creates a new table type.
    pub fn new(element: RefType, limits: Limits) -> TableType {
        TableType { element, limits }
    }

    /// Returns the element type.
    pub fn element(&self) -> RefType {
        self.element
    }

    /// Returns the size bounds.
    pub fn limits(&self) -> &Limits {
        &self.limits
    }
}

/// The type of a memory: its size bounds, in pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryType {
    limits: Limits,
}

impl MemoryType {
    /// Creates a new memory type.
    pub fn new(limits: Limits) -> MemoryType {
        MemoryType { limits }
    }

    /// Returns the size bounds.
    pub fn limits(&self) -> &Limits {
        &self.limits
    }
}

/// The kind of a runtime object or object type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternKind {
    /// A function.
    Func,
    /// A table.
    Table,
    /// A memory.
    Memory,
    /// A global.
    Global,
}

/// A required type for a runtime object: a kind tag plus the kind-specific
/// descriptor. Used purely for comparison against live objects.
#[derive(Debug, Clone, PartialEq)]
pub enum ExternType {
    /// A function signature.
    Func(FuncType),
    /// A table type.
    Table(TableType),
    /// A memory type.
    Memory(MemoryType),
    /// A global type.
    Global(GlobalType),
}

impl ExternType {
    /// Returns the kind tag of this type.
    pub fn kind(&self) -> ExternKind {
        match self {
            ExternType::Func(_) => ExternKind::Func,
            ExternType::Table(_) => ExternKind::Table,
            ExternType::Memory(_) => ExternKind::Memory,
            ExternType::Global(_) => ExternKind::Global,
        }
    }
}
