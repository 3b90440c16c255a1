//! Runtime value representation.
//!
//! Every scalar value the execution core moves across the native-call
//! boundary is carried as a 64-bit payload tagged with its [`ValType`]; the
//! invoke thunk protocol relies on this fixed-width layout.

use std::fmt;

/// The type of a WebAssembly scalar value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValType {
    /// 32-bit integer.
    I32,
    /// 64-bit integer.
    I64,
    /// 32-bit IEEE float.
    F32,
    /// 64-bit IEEE float.
    F64,
}

impl fmt::Display for ValType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValType::I32 => write!(f, "i32"),
            ValType::I64 => write!(f, "i64"),
            ValType::F32 => write!(f, "f32"),
            ValType::F64 => write!(f, "f64"),
        }
    }
}

/// A typed runtime value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Val {
    /// An `i32` value.
    I32(i32),
    /// An `i64` value.
    I64(i64),
    /// An `f32` value, stored as its raw bit pattern.
    F32(u32),
    /// An `f64` value, stored as its raw bit pattern.
    F64(u64),
}

impl Val {
    /// Returns the type of this value.
    pub fn ty(&self) -> ValType {
        match self {
            Val::I32(_) => ValType::I32,
            Val::I64(_) => ValType::I64,
            Val::F32(_) => ValType::F32,
            Val::F64(_) => ValType::F64,
        }
    }

    /// Returns the raw 64-bit payload of this value, as stored in an invoke
    /// thunk's argument cell. Narrower types occupy the low bits.
    pub fn to_bits(&self) -> u64 {
        match *self {
            Val::I32(x) => x as u32 as u64,
            Val::I64(x) => x as u64,
            Val::F32(x) => u64::from(x),
            Val::F64(x) => x,
        }
    }

    /// Reconstructs a value of type `ty` from a raw 64-bit argument cell.
    pub fn from_bits(ty: ValType, bits: u64) -> Val {
        match ty {
            ValType::I32 => Val::I32(bits as u32 as i32),
            ValType::I64 => Val::I64(bits as i64),
            ValType::F32 => Val::F32(bits as u32),
            ValType::F64 => Val::F64(bits),
        }
    }

    /// Returns the underlying `i32`, panicking if this value has a different
    /// type.
    pub fn unwrap_i32(&self) -> i32 {
        match *self {
            Val::I32(x) => x,
            _ => panic!("expected i32, got {}", self.ty()),
        }
    }

    /// Returns the underlying `i64`, panicking if this value has a different
    /// type.
    pub fn unwrap_i64(&self) -> i64 {
        match *self {
            Val::I64(x) => x,
            _ => panic!("expected i64, got {}", self.ty()),
        }
    }

    /// Returns the underlying `f32`, panicking if this value has a different
    /// type.
    pub fn unwrap_f32(&self) -> f32 {
        match *self {
            Val::F32(x) => f32::from_bits(x),
            _ => panic!("expected f32, got {}", self.ty()),
        }
    }

    /// Returns the underlying `f64`, panicking if this value has a different
    /// type.
    pub fn unwrap_f64(&self) -> f64 {
        match *self {
            Val::F64(x) => f64::from_bits(x),
            _ => panic!("expected f64, got {}", self.ty()),
        }
    }
}

impl From<i32> for Val {
    fn from(x: i32) -> Val {
        Val::I32(x)
    }
}

impl From<i64> for Val {
    fn from(x: i64) -> Val {
        Val::I64(x)
    }
}

impl From<f32> for Val {
    fn from(x: f32) -> Val {
        Val::F32(x.to_bits())
    }
}

impl From<f64> for Val {
    fn from(x: f64) -> Val {
        Val::F64(x.to_bits())
    }
}
