pub mod excerpt;
pub mod kernel;

pub use excerpt::Excerpt;
pub use kernel::Kernel;
