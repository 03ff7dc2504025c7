pub mod camera;
pub mod frame;
pub mod synthetic;

pub use camera::{CameraCapability, CameraHandle, SurfaceHandle};
pub use frame::{Frame, PixelRect, Plane};
pub use synthetic::SyntheticCamera;
