#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod controls;
mod driver;
mod route;
mod sampler;
mod session;
mod signal;

pub use controls::{validate_animation_controls, AnimationControls};
pub use driver::{CameraTarget, Driver, MapView};
pub use route::{RouteSplit, Status};
pub use sampler::{sample, CurrentPointSample};
pub use session::Session;
pub use signal::{Signal, Subscription};
