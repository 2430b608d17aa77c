//! Encapsulates the tun device the harness impersonates its peer on.
//!
//! A tun device delivers raw IP packets without any link layer header. Everything the kernel
//! routes into the subnet of the device is read from its descriptor, and every packet written to
//! the descriptor is received by the kernel as if it arrived from the wire.
//!
//! The types here are thin wrappers around the system calls. The [`harness`] builds the running
//! interface on top of them.
//!
//! [`harness`]: ../harness/index.html
#[path = "sys/mod.rs"]
mod sys_internal;

pub use self::sys_internal::exports as sys;
