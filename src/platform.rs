//! Interface to the platform collaborator.
//!
//! Signal/exception plumbing lives beneath this interface: the execution
//! core only requires that a unit of work can be run under a scope that
//! intercepts a fixed set of hardware faults and reports them as values, and
//! that the current thread's call stack can be captured as a list of
//! instruction pointers.

/// A single captured stack frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackFrame {
    /// The instruction pointer of this frame.
    pub ip: usize,
}

/// An ordered list of stack frames, innermost first.
#[derive(Debug, Clone, Default)]
pub struct CallStack {
    frames: Vec<StackFrame>,
}

impl CallStack {
    /// Creates a call stack from raw frames, innermost first.
    pub fn new(frames: Vec<StackFrame>) -> CallStack {
        CallStack { frames }
    }

    /// Returns the captured frames, innermost first.
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    /// Returns the number of captured frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns whether no frames were captured.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Removes the frames this stack shares with `caller`, leaving only the
    /// frames that belong to the faulted call itself.
    ///
    /// `caller` is the stack captured just before entering the protected
    /// call; the protected call adds one frame of its own beneath the
    /// faulting code, so `caller.len() + 1` trailing frames are dropped. A
    /// stack with no more frames than that is left untouched.
    pub fn trim_caller_frames(&mut self, caller: &CallStack) {
        if self.frames.len() >= caller.frames.len() + 1 {
            let keep = self.frames.len() - caller.frames.len() - 1;
            self.frames.truncate(keep);
        }
    }
}

/// The categories of hardware fault the platform scope intercepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareTrapKind {
    /// An illegal memory access.
    AccessViolation,
    /// Exhaustion of the native stack.
    StackOverflow,
    /// A faulting integer division or overflow.
    IntegerDivideByZeroOrOverflow,
}

/// A hardware fault intercepted while running a protected closure.
#[derive(Debug, Clone)]
pub struct HardwareTrap {
    /// The category of fault.
    pub kind: HardwareTrapKind,
    /// The full native call stack at the moment of the fault.
    pub call_stack: CallStack,
    /// The faulting memory address, when the fault category reports one.
    pub fault_address: Option<usize>,
}

/// The capabilities the execution core requires from the platform.
pub trait Platform {
    /// Captures the current thread's call stack.
    fn capture_call_stack(&self) -> CallStack;

    /// Runs `closure` under hardware-fault interception.
    ///
    /// Returns `None` if the closure returned normally, or the intercepted
    /// fault otherwise. On a fault the closure's stack is unwound without
    /// running destructors, so callers must not rely on drops inside it.
    fn catch_hardware_traps(&self, closure: &mut dyn FnMut()) -> Option<HardwareTrap>;

    /// Attempts generic symbol resolution of `ip`, returning a
    /// human-readable description.
    fn describe_instruction_pointer(&self, ip: usize) -> Option<String>;
}
