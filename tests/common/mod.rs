//! Mock code-generation and platform collaborators shared by the
//! integration tests.
//!
//! Guest functions here are ordinary Rust `extern "C"` functions. A guest
//! that wants to "fault" records the fault in a thread-local and returns;
//! [`TestPlatform::catch_hardware_traps`] then reports it exactly the way a
//! real fault-catching scope would, including a full trap-time stack built
//! from the recorded guest frames, the host call frame, and the caller
//! frames.

#![allow(dead_code)]

use std::cell::RefCell;
use std::mem;
use std::ops::Range;
use std::sync::Arc;
use weft_runtime::{
    CallStack, Compiler, FuncType, HardwareTrap, HardwareTrapKind, Platform, Runtime, StackFrame,
    VMFunctionBody, VMInvokeThunk, ValType,
};

/// Instruction pointer standing in for the host frame that performs the
/// protected call. Trimming must remove it.
pub const CALL_FRAME_IP: usize = 0xca11;

thread_local! {
    static PENDING_FAULT: RefCell<Option<PendingFault>> = RefCell::new(None);
}

struct PendingFault {
    kind: HardwareTrapKind,
    fault_address: Option<usize>,
    guest_frames: Vec<usize>,
}

/// Records a hardware fault as if the currently executing guest code had
/// just tripped it. `guest_frames` are the guest-side instruction pointers,
/// innermost first.
pub fn raise_fault(kind: HardwareTrapKind, fault_address: Option<usize>, guest_frames: &[usize]) {
    PENDING_FAULT.with(|slot| {
        *slot.borrow_mut() = Some(PendingFault {
            kind,
            fault_address,
            guest_frames: guest_frames.to_vec(),
        });
    });
}

/// Converts a Rust function address into a native entry point.
pub fn body(f: usize) -> *const VMFunctionBody {
    f as *const VMFunctionBody
}

pub fn init_logging() {
    let _ = pretty_env_logger::try_init();
}

/// Bundles the two mocks into a `Runtime`.
pub fn runtime(compiler: TestCompiler, platform: TestPlatform) -> Runtime {
    Runtime::new(Arc::new(compiler), Arc::new(platform))
}

pub struct TestCompiler {
    symbols: Vec<(Range<usize>, String)>,
}

impl TestCompiler {
    pub fn new() -> TestCompiler {
        TestCompiler {
            symbols: Vec::new(),
        }
    }

    /// Declares that compiled code occupies `range` and should be described
    /// with the given name.
    pub fn with_symbol(mut self, range: Range<usize>, name: &str) -> TestCompiler {
        self.symbols.push((range, name.to_string()));
        self
    }
}

impl Compiler for TestCompiler {
    fn invoke_thunk(&self, ty: &FuncType) -> VMInvokeThunk {
        match (ty.params(), ty.result()) {
            ([], None) => thunk_void,
            ([], Some(ValType::I32)) => thunk_to_i32,
            ([ValType::I32, ValType::I32], Some(ValType::I32)) => thunk_i32_i32_to_i32,
            ([ValType::F64], Some(ValType::F64)) => thunk_f64_to_f64,
            _ => panic!("test compiler has no invoke thunk for {}", ty),
        }
    }

    fn describe_instruction_pointer(&self, ip: usize) -> Option<String> {
        self.symbols
            .iter()
            .find(|(range, _)| range.contains(&ip))
            .map(|(range, name)| format!("{}+{:#x}", name, ip - range.start))
    }
}

pub struct TestPlatform {
    caller_frames: Vec<usize>,
    symbols: Vec<(usize, String)>,
}

impl TestPlatform {
    pub fn new() -> TestPlatform {
        TestPlatform {
            caller_frames: vec![0xf00d, 0xbeef],
            symbols: Vec::new(),
        }
    }

    /// Declares a platform-resolvable symbol at exactly `ip`.
    pub fn with_symbol(mut self, ip: usize, name: &str) -> TestPlatform {
        self.symbols.push((ip, name.to_string()));
        self
    }
}

impl Platform for TestPlatform {
    fn capture_call_stack(&self) -> CallStack {
        CallStack::new(
            self.caller_frames
                .iter()
                .map(|&ip| StackFrame { ip })
                .collect(),
        )
    }

    fn catch_hardware_traps(&self, closure: &mut dyn FnMut()) -> Option<HardwareTrap> {
        closure();
        PENDING_FAULT
            .with(|slot| slot.borrow_mut().take())
            .map(|fault| {
                let mut frames: Vec<StackFrame> = fault
                    .guest_frames
                    .iter()
                    .map(|&ip| StackFrame { ip })
                    .collect();
                frames.push(StackFrame { ip: CALL_FRAME_IP });
                frames.extend(self.caller_frames.iter().map(|&ip| StackFrame { ip }));
                HardwareTrap {
                    kind: fault.kind,
                    call_stack: CallStack::new(frames),
                    fault_address: fault.fault_address,
                }
            })
    }

    fn describe_instruction_pointer(&self, ip: usize) -> Option<String> {
        self.symbols
            .iter()
            .find(|(symbol_ip, _)| *symbol_ip == ip)
            .map(|(_, name)| name.clone())
    }
}

unsafe extern "C" fn thunk_void(body: *const VMFunctionBody, _values: *mut u64) {
    let f = mem::transmute::<*const VMFunctionBody, extern "C" fn()>(body);
    f();
}

unsafe extern "C" fn thunk_to_i32(body: *const VMFunctionBody, values: *mut u64) {
    let f = mem::transmute::<*const VMFunctionBody, extern "C" fn() -> i32>(body);
    *values = f() as u32 as u64;
}

unsafe extern "C" fn thunk_i32_i32_to_i32(body: *const VMFunctionBody, values: *mut u64) {
    let f = mem::transmute::<*const VMFunctionBody, extern "C" fn(i32, i32) -> i32>(body);
    let a = *values as u32 as i32;
    let b = *values.add(1) as u32 as i32;
    *values.add(2) = f(a, b) as u32 as u64;
}

unsafe extern "C" fn thunk_f64_to_f64(body: *const VMFunctionBody, values: *mut u64) {
    let f = mem::transmute::<*const VMFunctionBody, extern "C" fn(f64) -> f64>(body);
    let x = f64::from_bits(*values);
    *values.add(1) = f(x).to_bits();
}
