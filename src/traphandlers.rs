//! Translation of intercepted hardware faults into catchable errors.
//!
//! A fault inside a known table or memory guard region is a legitimate
//! sandbox violation by guest code and becomes an ordinary [`Trap`] the
//! embedder can catch. A fault outside every known reservation means the
//! runtime itself (or something worse) is broken and must never be surfaced
//! as a recoverable error; that path logs the call stack and terminates the
//! process.

use crate::platform::HardwareTrapKind;
use crate::store::Store;
use lazy_static::lazy_static;
use std::process;
use std::sync::RwLock;
use thiserror::Error;

/// A guest-attributable runtime error, catchable by the embedder.
///
/// The four fault variants carry the rendered call stack captured at the
/// moment of the fault, trimmed to the frames of the faulted call.
#[derive(Debug, Error, PartialEq)]
pub enum Trap {
    /// The arguments passed to an invocation disagree with the target
    /// function's signature.
    #[error("invoke signature mismatch")]
    InvokeSignatureMismatch,

    /// An access to a table element that has no defined value.
    #[error("undefined table element")]
    UndefinedTableElement {
        /// Rendered call stack at the moment of the fault.
        call_stack: Vec<String>,
    },

    /// A memory access outside the accessible bounds of a linear memory.
    #[error("out-of-bounds memory access")]
    OutOfBoundsMemoryAccess {
        /// Rendered call stack at the moment of the fault.
        call_stack: Vec<String>,
    },

    /// Exhaustion of the native stack during a call.
    #[error("stack overflow")]
    StackOverflow {
        /// Rendered call stack at the moment of the fault.
        call_stack: Vec<String>,
    },

    /// A faulting integer division or overflow.
    #[error("integer divide by zero or overflow")]
    IntegerDivideByZeroOrOverflow {
        /// Rendered call stack at the moment of the fault.
        call_stack: Vec<String>,
    },

    /// A state the runtime considers impossible was reached. Distinguished
    /// from the ordinary error kinds so that defensive tests and fuzzers can
    /// tell a broken invariant from a guest error.
    #[error("runtime invariant violated: {0}")]
    InvariantViolated(&'static str),
}

impl Trap {
    /// Returns the rendered call stack carried by this trap, if the trap
    /// kind captures one.
    pub fn call_stack(&self) -> &[String] {
        match self {
            Trap::UndefinedTableElement { call_stack }
            | Trap::OutOfBoundsMemoryAccess { call_stack }
            | Trap::StackOverflow { call_stack }
            | Trap::IntegerDivideByZeroOrOverflow { call_stack } => call_stack,
            Trap::InvokeSignatureMismatch | Trap::InvariantViolated(_) => &[],
        }
    }
}

/// A handler invoked in place of process termination when a fault outside
/// every known reservation is detected.
pub type FatalFaultHandler = fn(fault_address: usize, call_stack: &[String]) -> !;

lazy_static! {
    static ref FATAL_FAULT_HANDLER: RwLock<Option<FatalFaultHandler>> = RwLock::new(None);
}

/// Overrides the termination path taken for faults outside every known
/// table or memory reservation.
///
/// By default such a fault aborts the process after logging. A test harness
/// can install a diverging handler here to observe the path without taking
/// the whole test run down. The handler is process-global.
pub fn set_fatal_fault_handler(handler: FatalFaultHandler) {
    *FATAL_FAULT_HANDLER
        .write()
        .expect("fatal fault handler lock got poisoned") = Some(handler);
}

fn fatal_access_violation(fault_address: usize, call_stack: &[String]) -> ! {
    log::error!(
        "access violation at {:#x} outside of table or memory reserved addresses; call stack:",
        fault_address
    );
    for frame in call_stack {
        log::error!("  {}", frame);
    }
    let handler = *FATAL_FAULT_HANDLER
        .read()
        .expect("fatal fault handler lock got poisoned");
    match handler {
        Some(handler) => handler(fault_address, call_stack),
        None => process::abort(),
    }
}

/// Converts an intercepted hardware fault into a [`Trap`], given the rendered
/// call stack of the faulted call.
///
/// Access violations are attributed by asking the store which reservation
/// owns the faulting address; an address owned by neither a table nor a
/// memory does not return at all.
pub(crate) fn translate_hardware_trap(
    store: &Store,
    kind: HardwareTrapKind,
    fault_address: Option<usize>,
    call_stack: Vec<String>,
) -> Trap {
    match kind {
        HardwareTrapKind::AccessViolation => {
            let addr = match fault_address {
                Some(addr) => addr,
                None => {
                    return Trap::InvariantViolated(
                        "access violation reported without a faulting address",
                    )
                }
            };
            if store.table_owning_address(addr).is_some() {
                Trap::UndefinedTableElement { call_stack }
            } else if store.memory_owning_address(addr).is_some() {
                Trap::OutOfBoundsMemoryAccess { call_stack }
            } else {
                fatal_access_violation(addr, &call_stack)
            }
        }
        HardwareTrapKind::StackOverflow => Trap::StackOverflow { call_stack },
        HardwareTrapKind::IntegerDivideByZeroOrOverflow => {
            Trap::IntegerDivideByZeroOrOverflow { call_stack }
        }
    }
}
