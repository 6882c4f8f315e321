pub mod logging;
pub mod props;
pub mod signals;

pub use props::{load_property_source, MemoryPropertySource, PropertySource};
