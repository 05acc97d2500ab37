//! Top-level window lifecycle and window-manager requests.
//!
//! `NativeWindow` owns the X window and its graphics context, speaks the
//! cooperative WM protocols on their behalf, and keeps the display state
//! flags in sync with what the window manager reports.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    Atom, AtomEnum, ClientMessageEvent, ConfigureWindowAux, ConnectionExt, CreateGCAux,
    CreateWindowAux, EventMask, Gcontext, PropMode, Screen, Window, WindowClass,
    CLIENT_MESSAGE_EVENT,
};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use crate::atoms::{Atoms, resolved};
use crate::config::SplashConfig;
use crate::events::WindowEventHandler;
use crate::shared::{FrameExtents, Geometry, StyleMask, WindowHandle, WindowPosOptions, WindowSize};
use crate::splash::SplashScreen;
use crate::state::WindowState;

/// Format indicator for 32-bit client message payloads.
pub(crate) const CLIENT_MESSAGE_FORMAT: u8 = 32;

/// `_NET_WM_STATE` action codes.
const NET_WM_STATE_REMOVE: u32 = 0;
const NET_WM_STATE_ADD: u32 = 1;

/// Source indication: the request originates from a normal application.
const SOURCE_APPLICATION: u32 = 1;

/// Border width in pixels when the style mask asks for a border.
const DEFAULT_BORDER_WIDTH: u16 = 4;

/// Delivery mask by which a client asks the window manager, rather than the
/// target window, to act on a request.
fn manager_event_mask() -> EventMask {
    EventMask::STRUCTURE_NOTIFY | EventMask::SUBSTRUCTURE_REDIRECT
}

/// Controller for one top-level X window.
///
/// The connection is shared with the rest of the application and outlives
/// the window; it is never shut down here. A freshly constructed controller
/// has no window identity until [`NativeWindow::init_window`] completes.
pub struct NativeWindow {
    conn: Arc<RustConnection>,
    screen: Screen,
    window: Window,
    gc: Gcontext,
    atoms: Atoms,
    state: WindowState,
    splash: SplashConfig,
    splash_presented: bool,
}

impl NativeWindow {
    /// Bind a controller to a shared connection and screen. The root screen
    /// descriptor is read once here and treated as read-only afterwards.
    pub fn new(conn: Arc<RustConnection>, screen_num: usize, splash: SplashConfig) -> Self {
        let screen = conn.setup().roots[screen_num].clone();
        Self {
            conn,
            screen,
            window: x11rb::NONE,
            gc: x11rb::NONE,
            atoms: Atoms::default(),
            state: WindowState::default(),
            splash,
            splash_presented: false,
        }
    }

    /// Create the window resource and negotiate WM behavior.
    ///
    /// Creation failure is the single fatal error of this controller;
    /// everything downstream of it degrades with a diagnostic instead.
    pub fn init_window(&mut self, title: &str, geometry: Geometry, style: StyleMask) -> Result<()> {
        let gc = self
            .conn
            .generate_id()
            .context("Failed to allocate graphics context id")?;
        self.conn
            .create_gc(
                gc,
                self.screen.root,
                &CreateGCAux::new()
                    .foreground(self.screen.black_pixel)
                    .graphics_exposures(0),
            )
            .context("Failed to create graphics context")?;
        self.gc = gc;

        let window = self
            .conn
            .generate_id()
            .context("Failed to allocate window id")?;
        let event_mask = EventMask::STRUCTURE_NOTIFY
            | EventMask::KEY_PRESS
            | EventMask::KEY_RELEASE
            | EventMask::FOCUS_CHANGE
            | EventMask::PROPERTY_CHANGE
            | EventMask::EXPOSURE;
        self.conn
            .create_window(
                x11rb::COPY_DEPTH_FROM_PARENT,
                window,
                self.screen.root,
                geometry.x as i16,
                geometry.y as i16,
                geometry.width as u16,
                geometry.height as u16,
                border_width_for_style(style),
                WindowClass::INPUT_OUTPUT,
                self.screen.root_visual,
                &CreateWindowAux::new()
                    .background_pixel(self.screen.black_pixel)
                    .event_mask(event_mask),
            )
            .context("Failed to issue window creation")?
            .check()
            .context("Failed to create window")?;
        self.window = window;
        debug!("Created window {} ({:?})", window, geometry);

        self.set_title(title);
        self.state.geometry = geometry;

        self.atoms = Atoms::resolve(self.conn.as_ref());
        self.announce_wm_protocols();
        self.request_frame_extents();
        self.set_pid_property();

        self.conn
            .flush()
            .context("Failed to flush window setup requests")?;
        Ok(())
    }

    /// Release the window resource. Safe to call more than once; also runs
    /// on drop.
    pub fn destroy(&mut self) {
        if self.window != x11rb::NONE {
            debug!("Destroying window {}", self.window);
            if let Err(e) = self.conn.destroy_window(self.window) {
                warn!("Failed to destroy window {}: {}", self.window, e);
            }
            self.window = x11rb::NONE;
        }
        if self.gc != x11rb::NONE {
            if let Err(e) = self.conn.free_gc(self.gc) {
                warn!("Failed to free graphics context: {}", e);
            }
            self.gc = x11rb::NONE;
        }
        self.flush();
    }

    /// Identifier other subsystems address this window by.
    pub fn handle(&self) -> WindowHandle {
        WindowHandle::from_xid(self.window)
    }

    /// Geometry last confirmed by the window manager.
    pub fn geometry(&self) -> Geometry {
        self.state.geometry
    }

    /// Client-area size last confirmed by the window manager.
    pub fn size(&self) -> WindowSize {
        WindowSize::new(self.state.geometry.width, self.state.geometry.height)
    }

    pub fn activated(&self) -> bool {
        self.state.activated
    }

    pub(crate) fn atoms(&self) -> &Atoms {
        &self.atoms
    }

    pub(crate) fn root(&self) -> Window {
        self.screen.root
    }

    /// Map the window and, on first activation, present the startup splash.
    /// The splash blocks until its image has been painted once.
    pub fn activate(&mut self) {
        if self.state.activated {
            return;
        }
        if self.window == x11rb::NONE {
            warn!("activate called before init_window");
            return;
        }

        if let Err(e) = self.conn.map_window(self.window) {
            warn!("Failed to map window {}: {}", self.window, e);
        }
        self.flush();

        if !self.splash_presented {
            self.splash_presented = true;
            SplashScreen {
                conn: self.conn.as_ref(),
                window: self.window,
                gc: self.gc,
                depth: self.screen.root_depth,
                window_size: self.size(),
            }
            .present(&self.splash);
        }

        self.state.activated = true;
    }

    /// Unmap the window and emit the close notification. The notification
    /// goes out while the window still counts as activated; the flag flips
    /// afterwards, then the window is unmapped.
    pub fn deactivate<H: WindowEventHandler>(&mut self, handler: &mut H) {
        let handle = self.handle();
        if self.state.deactivate(handle, handler) {
            if let Err(e) = self.conn.unmap_window(self.window) {
                warn!("Failed to unmap window {}: {}", self.window, e);
            }
            self.flush();
        }
    }

    /// Write the display title and the icon/taskbar title in one property:
    /// both strings ride in a single buffer, each NUL-terminated.
    pub fn set_title(&mut self, title: &str) {
        if self.window == x11rb::NONE {
            return;
        }
        if let Err(e) = self.write_title_property(title) {
            warn!("Failed to set window title: {:#}", e);
        }
    }

    fn write_title_property(&self, title: &str) -> Result<()> {
        let buffer = title_property_bytes(title);
        self.conn
            .change_property(
                PropMode::REPLACE,
                self.window,
                AtomEnum::WM_CLASS,
                AtomEnum::STRING,
                8,
                buffer.len() as u32,
                &buffer,
            )?
            .check()?;
        Ok(())
    }

    /// Resize the client area. A mapped window is unmapped for the duration
    /// of the geometry change and remapped afterwards. The resize
    /// notification path runs regardless of mapped state.
    pub fn resize_client_area<H: WindowEventHandler>(
        &mut self,
        size: WindowSize,
        _options: &WindowPosOptions,
        handler: &mut H,
    ) {
        if self.state.activated {
            if let Err(e) = self.conn.unmap_window(self.window) {
                warn!("Failed to unmap window for resize: {}", e);
            }
        }

        if let Err(e) = self.conn.configure_window(
            self.window,
            &ConfigureWindowAux::new().width(size.width).height(size.height),
        ) {
            warn!("Failed to resize window to {}x{}: {}", size.width, size.height, e);
        }

        if self.state.activated {
            if let Err(e) = self.conn.map_window(self.window) {
                warn!("Failed to remap window after resize: {}", e);
            }
            self.flush();
        }

        self.window_size_changed(size.width, size.height, handler);
    }

    pub fn supports_client_area_resize(&self) -> bool {
        true
    }

    /// Fixed placeholder; the actual rate is not queried from the display
    /// hardware.
    pub fn display_refresh_rate(&self) -> u32 {
        60
    }

    /// Last-known fullscreen state as reported by the window manager, or as
    /// optimistically stored by [`NativeWindow::set_fullscreen`].
    pub fn fullscreen(&self) -> bool {
        self.state.fullscreen
    }

    /// Decouple the consumer's logical resolution from the client-area size:
    /// while enabled, resize notifications no longer imply a resolution
    /// change.
    pub fn set_customized_resolution(&mut self, enabled: bool) {
        self.state.customized_resolution = enabled;
    }

    /// Ask the window manager to enter or leave fullscreen.
    ///
    /// The stored flag is set to the requested value without waiting for
    /// confirmation; the manager's answer is only folded back in on the next
    /// [`NativeWindow::refresh_wm_state`] call.
    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        if !resolved(self.atoms.net_wm_state) || !resolved(self.atoms.net_wm_state_fullscreen) {
            warn!("_NET_WM_STATE atoms unresolved; fullscreen change ignored");
            return;
        }

        self.refresh_wm_state();
        let plan = plan_fullscreen_change(&self.state, fullscreen);

        let request = state_change_message(
            self.window,
            self.atoms.net_wm_state,
            plan.action,
            self.atoms.net_wm_state_fullscreen,
        );
        if let Err(e) = self.send_manager_request(request) {
            warn!("Failed to send fullscreen state change: {:#}", e);
        }

        // The bypass hint mirrors the state the window is leaving, so it is
        // written before the stored flag is overwritten below.
        if resolved(self.atoms.net_wm_bypass_compositor) {
            if let Err(e) =
                self.set_cardinal_property(self.atoms.net_wm_bypass_compositor, plan.bypass_hint)
            {
                warn!("Failed to update compositor bypass hint: {:#}", e);
            }
        }

        if plan.drop_maximize {
            debug!("Removing maximized state");
            let request = unmaximize_message(
                self.window,
                self.atoms.net_wm_state,
                self.atoms.net_wm_state_maximized_vert,
                self.atoms.net_wm_state_maximized_horz,
            );
            if let Err(e) = self.send_manager_request(request) {
                warn!("Failed to remove maximized state: {:#}", e);
            }
        }

        self.flush();
        self.state.fullscreen = fullscreen;
    }

    /// Re-query `_NET_WM_STATE` and rebuild the fullscreen/maximize flags
    /// from scratch. A failed query leaves the previous flags untouched.
    pub fn refresh_wm_state(&mut self) {
        if !resolved(self.atoms.net_wm_state) {
            debug!("_NET_WM_STATE atom unresolved; state query skipped");
            return;
        }
        match self.query_wm_state() {
            Ok(states) => self.state.rebuild_wm_flags(&states, &self.atoms),
            Err(e) => warn!("Acquiring _NET_WM_STATE from the window manager failed: {:#}", e),
        }
    }

    fn query_wm_state(&self) -> Result<Vec<Atom>> {
        let reply = self
            .conn
            .get_property(
                false,
                self.window,
                self.atoms.net_wm_state,
                AtomEnum::ATOM,
                0,
                1024,
            )
            .context("Failed to request _NET_WM_STATE")?
            .reply()
            .context("No reply for _NET_WM_STATE")?;

        if reply.format != 32 || reply.type_ != u32::from(AtomEnum::ATOM) {
            return Err(anyhow!(
                "unexpected _NET_WM_STATE reply (format {}, type {})",
                reply.format,
                reply.type_
            ));
        }
        Ok(reply.value32().map(|values| values.collect()).unwrap_or_default())
    }

    /// Decoration extents the window manager advertised for this window.
    pub fn frame_extents(&self) -> Option<FrameExtents> {
        if self.window == x11rb::NONE || !resolved(self.atoms.net_frame_extents) {
            return None;
        }
        let reply = self
            .conn
            .get_property(
                false,
                self.window,
                self.atoms.net_frame_extents,
                AtomEnum::CARDINAL,
                0,
                4,
            )
            .ok()?
            .reply()
            .ok()?;
        let values: Vec<u32> = reply.value32()?.collect();
        if values.len() < 4 {
            return None;
        }
        Some(FrameExtents {
            left: values[0],
            right: values[1],
            top: values[2],
            bottom: values[3],
        })
    }

    /// Echo a liveness ping back to the root window with the payload intact.
    pub(crate) fn reply_to_ping(&self, ping: &ClientMessageEvent) {
        let reply = ping_reply(ping, self.root());
        if let Err(e) = self
            .conn
            .send_event(false, self.root(), manager_event_mask(), reply)
        {
            warn!("Failed to answer _NET_WM_PING: {}", e);
            return;
        }
        self.flush();
    }

    pub(crate) fn window_size_changed<H: WindowEventHandler>(
        &mut self,
        width: u32,
        height: u32,
        handler: &mut H,
    ) {
        let handle = self.handle();
        self.state.confirm_size(handle, width, height, handler);
    }

    fn announce_wm_protocols(&self) {
        if !resolved(self.atoms.wm_protocols) {
            warn!("WM_PROTOCOLS atom unresolved; close and ping negotiation disabled");
            return;
        }
        let protocols: Vec<Atom> = [self.atoms.wm_delete_window, self.atoms.net_wm_ping]
            .into_iter()
            .filter(|&atom| resolved(atom))
            .collect();
        if protocols.is_empty() {
            warn!("No WM protocol atoms resolved; close and ping negotiation disabled");
            return;
        }
        if let Err(e) = self.conn.change_property32(
            PropMode::REPLACE,
            self.window,
            self.atoms.wm_protocols,
            AtomEnum::ATOM,
            &protocols,
        ) {
            warn!("Failed to announce WM protocols: {}", e);
        }
    }

    /// Sent once, before the window is mapped, so the manager publishes its
    /// decoration extents early.
    fn request_frame_extents(&self) {
        if !resolved(self.atoms.net_request_frame_extents) {
            warn!("_NET_REQUEST_FRAME_EXTENTS atom unresolved; request skipped");
            return;
        }
        let request = ClientMessageEvent::new(
            CLIENT_MESSAGE_FORMAT,
            self.window,
            self.atoms.net_request_frame_extents,
            [0, 0, 0, 0, 0],
        );
        if let Err(e) = self.send_manager_request(request) {
            warn!("Failed to request frame extents: {:#}", e);
        }
    }

    /// Records the process id so the window manager can terminate the
    /// process if it stops answering pings.
    fn set_pid_property(&self) {
        if !resolved(self.atoms.net_wm_pid) {
            debug!("_NET_WM_PID atom unresolved; pid property skipped");
            return;
        }
        if let Err(e) = self.set_cardinal_property(self.atoms.net_wm_pid, std::process::id()) {
            warn!("Failed to record _NET_WM_PID: {:#}", e);
        }
    }

    fn set_cardinal_property(&self, property: Atom, value: u32) -> Result<()> {
        self.conn
            .change_property(
                PropMode::REPLACE,
                self.window,
                property,
                AtomEnum::CARDINAL,
                32,
                1,
                &value.to_ne_bytes(),
            )?
            .check()?;
        Ok(())
    }

    fn send_manager_request(&self, request: ClientMessageEvent) -> Result<()> {
        self.conn
            .send_event(true, self.screen.root, manager_event_mask(), request)?
            .check()?;
        Ok(())
    }

    fn flush(&self) {
        if let Err(e) = self.conn.flush() {
            warn!("Failed to flush connection: {}", e);
        }
    }
}

impl Drop for NativeWindow {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Outgoing side of one fullscreen transition, derived from the state the
/// manager last confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FullscreenPlan {
    pub action: u32,
    /// Compositor bypass hint, taken from the pre-transition state.
    pub bypass_hint: u32,
    pub drop_maximize: bool,
}

pub(crate) fn plan_fullscreen_change(state: &WindowState, fullscreen: bool) -> FullscreenPlan {
    FullscreenPlan {
        action: if fullscreen { NET_WM_STATE_ADD } else { NET_WM_STATE_REMOVE },
        bypass_hint: u32::from(state.fullscreen),
        drop_maximize: !fullscreen && (state.maximized_horz || state.maximized_vert),
    }
}

pub(crate) fn state_change_message(
    window: Window,
    state_atom: Atom,
    action: u32,
    target: Atom,
) -> ClientMessageEvent {
    ClientMessageEvent::new(
        CLIENT_MESSAGE_FORMAT,
        window,
        state_atom,
        [action, target, 0, SOURCE_APPLICATION, 0],
    )
}

/// Dual-atom removal: both maximize atoms ride in the first two data words;
/// the action word is omitted for this message shape.
pub(crate) fn unmaximize_message(
    window: Window,
    state_atom: Atom,
    vert: Atom,
    horz: Atom,
) -> ClientMessageEvent {
    ClientMessageEvent::new(CLIENT_MESSAGE_FORMAT, window, state_atom, [vert, horz, 0, 0, 0])
}

/// A ping reply is the ping itself, re-addressed to the root window with the
/// response kind normalized.
pub(crate) fn ping_reply(ping: &ClientMessageEvent, root: Window) -> ClientMessageEvent {
    ClientMessageEvent {
        response_type: CLIENT_MESSAGE_EVENT,
        window: root,
        ..*ping
    }
}

fn border_width_for_style(style: StyleMask) -> u16 {
    if style.intersects(StyleMask::BORDERED | StyleMask::RESIZEABLE) {
        DEFAULT_BORDER_WIDTH
    } else {
        0
    }
}

fn title_property_bytes(title: &str) -> Vec<u8> {
    let mut buffer = Vec::with_capacity((title.len() + 1) * 2);
    buffer.extend_from_slice(title.as_bytes());
    buffer.push(0);
    buffer.extend_from_slice(title.as_bytes());
    buffer.push(0);
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_buffer_holds_two_nul_terminated_copies() {
        let buffer = title_property_bytes("App");
        assert_eq!(buffer, b"App\0App\0");
        assert_eq!(buffer.len(), 2 * ("App".len() + 1));
    }

    #[test]
    fn empty_title_still_produces_two_terminators() {
        assert_eq!(title_property_bytes(""), b"\0\0");
    }

    #[test]
    fn border_width_follows_style_mask() {
        assert_eq!(border_width_for_style(StyleMask::BORDERED), DEFAULT_BORDER_WIDTH);
        assert_eq!(border_width_for_style(StyleMask::RESIZEABLE), DEFAULT_BORDER_WIDTH);
        assert_eq!(
            border_width_for_style(StyleMask::BORDERED | StyleMask::RESIZEABLE),
            DEFAULT_BORDER_WIDTH
        );
        assert_eq!(border_width_for_style(StyleMask::TITLED), 0);
        assert_eq!(border_width_for_style(StyleMask::empty()), 0);
    }

    #[test]
    fn entering_fullscreen_adds_the_state() {
        let state = WindowState::default();
        let plan = plan_fullscreen_change(&state, true);
        assert_eq!(plan.action, NET_WM_STATE_ADD);
        assert_eq!(plan.bypass_hint, 0);
        assert!(!plan.drop_maximize);
    }

    #[test]
    fn leaving_fullscreen_with_maximize_set_drops_it_once() {
        let mut state = WindowState {
            fullscreen: true,
            maximized_horz: true,
            ..WindowState::default()
        };

        let plan = plan_fullscreen_change(&state, false);
        assert_eq!(plan.action, NET_WM_STATE_REMOVE);
        assert_eq!(plan.bypass_hint, 1);
        assert!(plan.drop_maximize);

        // After the manager confirms the new state, a repeated request no
        // longer drops the maximized atoms.
        state.rebuild_wm_flags(&[], &Atoms::default());
        let plan = plan_fullscreen_change(&state, false);
        assert_eq!(plan.bypass_hint, 0);
        assert!(!plan.drop_maximize);
    }

    #[test]
    fn leaving_fullscreen_without_maximize_sends_no_removal() {
        let state = WindowState {
            fullscreen: true,
            ..WindowState::default()
        };
        let plan = plan_fullscreen_change(&state, false);
        assert!(!plan.drop_maximize);
    }

    #[test]
    fn state_change_message_layout() {
        let message = state_change_message(7, 200, NET_WM_STATE_ADD, 201);
        assert_eq!(message.format, CLIENT_MESSAGE_FORMAT);
        assert_eq!(message.window, 7);
        assert_eq!(message.type_, 200);
        assert_eq!(message.data.as_data32(), [1, 201, 0, SOURCE_APPLICATION, 0]);
    }

    #[test]
    fn unmaximize_message_carries_both_atoms() {
        let message = unmaximize_message(7, 200, 303, 302);
        assert_eq!(message.data.as_data32(), [303, 302, 0, 0, 0]);
    }

    #[test]
    fn ping_reply_preserves_payload_and_retargets_root() {
        let ping = ClientMessageEvent {
            response_type: CLIENT_MESSAGE_EVENT,
            format: CLIENT_MESSAGE_FORMAT,
            sequence: 9,
            window: 55,
            type_: 100,
            data: [102, 12345, 55, 0, 0].into(),
        };
        let reply = ping_reply(&ping, 1);
        assert_eq!(reply.window, 1);
        assert_eq!(reply.response_type, CLIENT_MESSAGE_EVENT);
        assert_eq!(reply.format, ping.format);
        assert_eq!(reply.type_, ping.type_);
        assert_eq!(reply.data.as_data32(), ping.data.as_data32());
    }
}
