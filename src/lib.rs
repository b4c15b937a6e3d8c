// Live virtual nail polish over a camera feed.
//
// Two clocks share state here: the display-rate render loop and the
// segmentation scheduler. The scheduler publishes whole masks through a
// `watch` channel; the render loop reads whatever is current each tick.

pub mod camera;
pub mod config;
pub mod draw;
pub mod error;
pub mod gamma;
pub mod input;
pub mod mask;
pub mod perf;
pub mod render;
pub mod render_loop;
pub mod scheduler;
pub mod segment;
pub mod session;
pub mod types;

pub use error::Error;
