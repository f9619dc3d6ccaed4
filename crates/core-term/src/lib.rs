//! core-term: the terminal state machine.
//!
//! This crate ties the cell grid, the ring-buffered screens, the escape
//! parser, and the key/mouse encoders into one `Term`. The host feeds it
//! pty bytes with [`Term::feed`] and input events with
//! [`Term::key_event`] / [`Term::mouse_event`]; everything the emulator
//! wants written back to the pty accumulates in the owned
//! [`core_writable::WritableQueue`], which the host drains on
//! pty-writable.
//!
//! The core is single-threaded and never blocks; the only suspending
//! operations (reading and writing the pty) live in the host. Nothing in
//! here panics on pty input: malformed sequences are logged with a
//! printable dump and dropped.

mod charset;
mod config;
mod input;
mod parser;
mod reflow;
mod selection;
mod term;
mod utf8;

pub use config::Config;
pub use selection::{SelSnap, SelType};
pub use term::{
    CursorStyle, NoopHooks, Term, TermError, TermHooks, TermMode, WinMode, VTIDEN,
};
