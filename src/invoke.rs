//! Invoking compiled functions from the host.

use crate::compiler::Compiler;
use crate::platform::{CallStack, Platform};
use crate::stack::describe_call_stack;
use crate::store::{FuncId, Store};
use crate::traphandlers::{translate_hardware_trap, Trap};
use crate::values::Val;
use std::sync::Arc;

/// The invocation engine: the code-generation and platform collaborators
/// bundled together.
///
/// A `Runtime` is cheap to clone and safe to share; invocations started from
/// separate threads are independent of each other.
#[derive(Clone)]
pub struct Runtime {
    compiler: Arc<dyn Compiler + Send + Sync>,
    platform: Arc<dyn Platform + Send + Sync>,
}

impl Runtime {
    /// Creates a runtime from its two collaborators.
    pub fn new(
        compiler: Arc<dyn Compiler + Send + Sync>,
        platform: Arc<dyn Platform + Send + Sync>,
    ) -> Runtime {
        Runtime { compiler, platform }
    }

    /// Calls `function` with the given parameters, blocking until the call
    /// returns or faults.
    ///
    /// The parameters must agree with the function's signature in count and
    /// per-position type; a disagreement fails with
    /// [`Trap::InvokeSignatureMismatch`] before any native code runs. A
    /// successful call returns the function's result, or `None` for a
    /// void-returning function. A hardware fault inside the call is
    /// classified and returned as a [`Trap`] carrying the rendered call
    /// stack of the faulted call, unless the faulting address lies outside
    /// every known reservation, in which case the process terminates (see
    /// [`set_fatal_fault_handler`](crate::set_fatal_fault_handler)).
    pub fn invoke(
        &self,
        store: &Store,
        function: FuncId,
        parameters: &[Val],
    ) -> Result<Option<Val>, Trap> {
        let func = store.function(function);
        let ty = func.ty();

        // Check the parameters against the signature and copy them into a
        // buffer of 64-bit cells, one per parameter, in order. The cell
        // after the last parameter receives a non-void result.
        if parameters.len() != ty.params().len() {
            return Err(Trap::InvokeSignatureMismatch);
        }
        let mut values_vec: Vec<u64> = vec![0; ty.cell_count()];
        for (index, (parameter, expected)) in parameters.iter().zip(ty.params()).enumerate() {
            if parameter.ty() != *expected {
                return Err(Trap::InvokeSignatureMismatch);
            }
            values_vec[index] = parameter.to_bits();
        }

        let thunk = self.compiler.invoke_thunk(ty);
        let body = func.body();

        // The caller stack is the trim baseline for a trapped stack, so it
        // must be captured before the protected call begins.
        let caller_stack = self.platform.capture_call_stack();

        log::trace!("invoking function {:?} with signature {}", function, ty);
        let values_ptr = values_vec.as_mut_ptr();
        let outcome = self
            .platform
            .catch_hardware_traps(&mut || unsafe { thunk(body, values_ptr) });

        match outcome {
            None => Ok(ty
                .result()
                .map(|result_ty| Val::from_bits(result_ty, values_vec[ty.params().len()]))),
            Some(mut trap) => {
                trap.call_stack.trim_caller_frames(&caller_stack);
                let description = self.describe_call_stack(&trap.call_stack);
                Err(translate_hardware_trap(
                    store,
                    trap.kind,
                    trap.fault_address,
                    description,
                ))
            }
        }
    }

    /// Renders each frame of `call_stack` to a human-readable string; see
    /// [`describe_call_stack`](crate::describe_call_stack).
    pub fn describe_call_stack(&self, call_stack: &CallStack) -> Vec<String> {
        describe_call_stack(&*self.compiler, &*self.platform, call_stack)
    }
}
