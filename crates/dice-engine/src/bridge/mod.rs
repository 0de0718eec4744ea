pub mod protocol;

pub use protocol::{FrameBuffer, ProtocolLayout};
