//! Types shared between the window controller and its consumers.

use bitflags::bitflags;
use x11rb::protocol::xproto::Window;

/// Window geometry in pixels, relative to the root window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

/// Client-area size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

impl WindowSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

bitflags! {
    /// Style requested for a top-level window.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StyleMask: u32 {
        const TITLED     = 1 << 0;
        const CLOSABLE   = 1 << 1;
        const MINIMIZE   = 1 << 2;
        const MAXIMIZE   = 1 << 3;
        const RESIZEABLE = 1 << 4;
        const BORDERED   = 1 << 5;
    }
}

/// Placement options accepted by `resize_client_area`. The X11 path only
/// resizes; placement stays with the window manager.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowPosOptions {
    pub ignore_position: bool,
}

/// Decoration extents reported by the window manager, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameExtents {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

/// Opaque identifier a window is addressed by in notifications.
///
/// Wraps the X window id so that other subsystems never handle it as a bare
/// number; `from_xid`/`xid` are the only conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(Window);

impl WindowHandle {
    pub fn from_xid(xid: Window) -> Self {
        Self(xid)
    }

    pub fn xid(self) -> Window {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_handle_preserves_xid() {
        let handle = WindowHandle::from_xid(0x2c0000f);
        assert_eq!(handle.xid(), 0x2c0000f);
    }
}
