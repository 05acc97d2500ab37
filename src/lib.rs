//! Native X11 window control for engine runtimes.
//!
//! Creates a top-level window over a shared XCB connection, negotiates the
//! cooperative window-manager protocols (close requests, liveness pings,
//! fullscreen/maximize state, frame extents), translates raw protocol events
//! into window lifecycle notifications, and paints a one-shot startup image
//! before the renderer takes over the surface.
//!
//! The connection itself is supplied by the embedding application and is
//! never closed here; the controller owns only the window, its graphics
//! context, and the ephemeral splash pixmap.

pub mod atoms;
pub mod config;
pub mod events;
pub mod shared;
mod splash;
mod state;
pub mod window;

pub use atoms::Atoms;
pub use config::{Config, SplashConfig};
pub use events::WindowEventHandler;
pub use shared::{FrameExtents, Geometry, StyleMask, WindowHandle, WindowPosOptions, WindowSize};
pub use window::NativeWindow;
