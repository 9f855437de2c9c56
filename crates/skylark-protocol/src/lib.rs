//! # Skylark Control Protocol
//!
//! Message shapes and wire constants for the Skylark voice-session
//! control protocol.
//!
//! The control protocol is JSON carried over a publish/subscribe signaling
//! channel. A session opens with a client `hello`, the server answers with
//! its own `hello` carrying the datagram endpoint and per-session key
//! material, and either side ends the session with a `goodbye`.
//!
//! ```text
//! Client                                          Server
//!   |                                               |
//!   |--- hello (version, codec, framing) --------->|
//!   |                                               |
//!   |<-- hello (session_id, udp endpoint, key) ----|
//!   |                                               |
//!   |====== encrypted audio over datagrams ========|
//!   |                                               |
//!   |--- goodbye (session_id) -------------------->|
//! ```

pub mod constants;
pub mod errors;
pub mod hex_str;
pub mod messages;

pub use constants::*;
pub use errors::*;
pub use hex_str::*;
pub use messages::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::constants::*;
    pub use crate::errors::*;
    pub use crate::hex_str::*;
    pub use crate::messages::*;
}
