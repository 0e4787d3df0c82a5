pub mod reader;
pub mod state;
pub mod stream;

pub use reader::{ReadMode, StreamEngine};
pub use state::StreamState;
pub use stream::{SampleStream, StreamEvent};
