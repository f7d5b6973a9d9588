pub mod codec;
pub mod event;
pub mod fields;
pub mod framer;
pub mod parser;

pub use codec::LineCodec;
pub use event::Event;
pub use fields::ParsedFields;
pub use framer::{DrainLines, FramerState, LineFramer};
pub use parser::LineDecoder;
