//! Interface to the code-generation collaborator.
//!
//! The execution core never compiles anything itself; it asks an
//! implementation of [`Compiler`] for the per-signature invoke thunk used to
//! enter compiled code, and for symbol information when rendering call
//! stacks.

use crate::types::FuncType;

/// A placeholder byte-sized type for the start of a compiled function body.
///
/// Entry points are passed around as `*const VMFunctionBody` so they cannot
/// be confused with data pointers.
#[repr(C)]
pub struct VMFunctionBody(u8);

/// The signature of an invoke thunk produced by the code generator.
///
/// A thunk receives the target function's entry point and a buffer of 64-bit
/// cells holding one raw parameter per cell, in signature order. The thunk
/// unpacks the cells into the target calling convention, performs the call,
/// and writes a non-void result back into the cell immediately following the
/// last parameter cell. [`FuncType::cell_count`] gives the buffer size both
/// sides must agree on.
pub type VMInvokeThunk = unsafe extern "C" fn(*const VMFunctionBody, *mut u64);

/// The capabilities the execution core requires from the code generator.
pub trait Compiler {
    /// Returns the invoke thunk for the given signature, producing it on
    /// demand if necessary.
    fn invoke_thunk(&self, ty: &FuncType) -> VMInvokeThunk;

    /// Attempts to describe `ip` as an address inside a compiled function,
    /// returning a human-readable description of the function and offset.
    ///
    /// Returns `None` if the address does not belong to any code this
    /// compiler produced.
    fn describe_instruction_pointer(&self, ip: usize) -> Option<String>;
}
