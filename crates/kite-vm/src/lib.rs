//! The Kite virtual machine.
//!
//! Loads class files produced by `kite-codegen`, verifies every method
//! against its control-flow graph and runs them on a stack interpreter.
//! The standard library is implemented natively; programs talk to the
//! outside world only through a [`Console`].
//!
//! ```text
//! ClassFile ──define_class──▶ ClassLoader (validate + verify)
//!                                  │
//!            instantiate / invoke_static
//!                                  ▼
//!                        Vm dispatch loop ──▶ Natives ──▶ Console
//! ```

pub mod console;
pub mod error;
pub mod interpreter;
pub mod loader;
pub mod natives;
pub mod value;

pub use console::{Console, MemoryConsole, StdConsole};
pub use error::{StackFrame, Thrown, VmError, VmResult};
pub use interpreter::{Vm, VmOptions};
pub use loader::{ClassLoader, LoadedClass};
pub use natives::{NativeContext, NativeFn, NativeResult, Natives, Raise};
pub use value::{Object, ObjectRef, Value};

#[cfg(test)]
#[path = "../tests/test_support.rs"]
pub(crate) mod test_support;
