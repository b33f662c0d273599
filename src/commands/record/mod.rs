//! Record command.
//!
//! ```text
//! Request:  GOB\n<frame>
//! Response: (none)
//! ```
//!
//! The frame layout is described in [`codec`]. A frame that fails to decode
//! is reported and dropped; the connection stays open.

pub mod codec;
pub mod handler;

pub use handler::RecordHandler;
