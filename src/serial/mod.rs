pub mod reader;

pub use reader::{CommandReader, FrameAccumulator, ReadResult};
