pub mod video;

pub use video::VideoDecoder;
