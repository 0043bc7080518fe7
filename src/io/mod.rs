mod partial;

pub use partial::PartialStream;
