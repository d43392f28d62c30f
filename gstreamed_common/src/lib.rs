pub mod discovery;
pub mod media;
pub mod pipeline;
pub mod preview;
pub mod sink;
pub mod source;
