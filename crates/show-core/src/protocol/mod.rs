//! Protocol module: event names and the JSON frame codec.

pub mod codec;
pub mod events;

pub use codec::{decode_ack, decode_frame, encode_frame, AckError, Frame, ProtocolError};
pub use events::{Direction, EventName};
