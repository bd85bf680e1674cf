pub mod fb;
pub mod touch;

pub use fb::FbSurface;
