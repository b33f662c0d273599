//! Text command.
//!
//! ```text
//! Request:  STRING\n<text>\n
//! Response: Thank you. \n
//! ```
//!
//! Surrounding whitespace is stripped from the text before it is reported.

pub mod handler;

pub use handler::{TextHandler, ACK};
