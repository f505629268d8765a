//! Start line and header serialization.
//!
//! - [`HeaderEncoder`]: writes the request or status line, every header in caller order,
//!   and the blank line that ends the head, resuming across calls when the output buffer
//!   fills up

mod header_encoder;

pub(crate) use header_encoder::HeaderEncoder;
