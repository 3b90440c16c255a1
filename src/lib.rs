//! Execution core for a WebAssembly virtual machine.
//!
//! This crate runs already-compiled machine code on behalf of guest
//! functions and turns the hardware faults that code can raise (illegal
//! memory accesses, integer-divide faults, stack exhaustion) into
//! well-defined, catchable [`Trap`] values instead of process crashes. It
//! also maintains the runtime object model (functions, tables, memories,
//! globals) and the structural compatibility check used when linking objects
//! across module boundaries.
//!
//! Code generation and signal/exception plumbing are not part of this crate;
//! they are reached through the [`Compiler`] and [`Platform`] traits.

#![deny(missing_docs, trivial_numeric_casts, unused_extern_crates)]
#![warn(unused_import_braces)]

mod compiler;
mod invoke;
mod platform;
mod stack;
mod store;
mod traphandlers;
mod types;
mod values;

pub use crate::compiler::{Compiler, VMFunctionBody, VMInvokeThunk};
pub use crate::invoke::Runtime;
pub use crate::platform::{CallStack, HardwareTrap, HardwareTrapKind, Platform, StackFrame};
pub use crate::stack::{describe_call_stack, UNKNOWN_FUNCTION};
pub use crate::store::{
    Extern, FuncId, FunctionInstance, GlobalId, GlobalInstance, MemoryId, MemoryInstance,
    Reservation, Store, TableId, TableInstance,
};
pub use crate::traphandlers::{set_fatal_fault_handler, FatalFaultHandler, Trap};
pub use crate::types::{
    ExternKind, ExternType, FuncType, GlobalType, Limits, MemoryType, Mutability, RefType,
    TableType,
};
pub use crate::values::{Val, ValType};

/// Version number of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
