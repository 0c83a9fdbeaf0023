//! Testing utilities and harness for the Vellum list engine

pub mod recording;
pub mod robot;

pub use recording::{HostEvent, RecordingHost, RecordingRenderer, RenderedCell, RendererEvent};
pub use robot::*;

pub mod prelude {
    pub use crate::recording::*;
    pub use crate::robot::*;
}
