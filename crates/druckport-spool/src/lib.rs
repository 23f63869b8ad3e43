// SPDX-License-Identifier: MIT
// Druckport Spool — the secure intake-and-invocation pipeline.
//
// Everything user-supplied passes through `validate` before it can reach the
// filesystem or a process argument; the spooler and inspection binaries are
// always invoked as discrete argument vectors, never through a shell.

pub mod command;
pub mod exec;
pub mod inspect;
pub mod listing;
pub mod validate;
pub mod workspace;

pub use validate::RawPrintForm;
pub use workspace::Workspace;
