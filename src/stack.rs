//! Rendering captured call stacks to human-readable form.

use crate::compiler::Compiler;
use crate::platform::{CallStack, Platform};

/// The description emitted for a frame no symbol source can resolve.
pub const UNKNOWN_FUNCTION: &str = "<unknown function>";

/// Renders each frame of `call_stack` to a string, in capture order.
///
/// The code generator is consulted first: frames inside compiled guest code
/// are usually invisible to generic platform symbolication, so asking the
/// platform first would misreport exactly the frames this crate cares most
/// about. Frames neither source recognizes render as
/// [`UNKNOWN_FUNCTION`].
pub fn describe_call_stack(
    compiler: &dyn Compiler,
    platform: &dyn Platform,
    call_stack: &CallStack,
) -> Vec<String> {
    call_stack
        .frames()
        .iter()
        .map(|frame| {
            compiler
                .describe_instruction_pointer(frame.ip)
                .or_else(|| platform.describe_instruction_pointer(frame.ip))
                .unwrap_or_else(|| UNKNOWN_FUNCTION.to_string())
        })
        .collect()
}
