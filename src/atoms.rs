//! Interned protocol atoms used for window-manager negotiation.

use tracing::warn;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{Atom, ConnectionExt};

/// Holds every atom the controller negotiates with.
///
/// An entry that failed to resolve holds `x11rb::NONE`; features keyed on it
/// degrade to a no-op. The whole set is resolved once, immediately after
/// window creation; event handling never resolves atoms lazily.
#[derive(Debug, Clone, Copy, Default)]
pub struct Atoms {
    pub wm_protocols: Atom,
    pub wm_delete_window: Atom,
    pub net_wm_ping: Atom,
    pub net_wm_state: Atom,
    pub net_wm_state_fullscreen: Atom,
    pub net_wm_state_maximized_horz: Atom,
    pub net_wm_state_maximized_vert: Atom,
    pub net_request_frame_extents: Atom,
    pub net_frame_extents: Atom,
    pub net_wm_pid: Atom,
    pub net_wm_bypass_compositor: Atom,
    pub net_active_window: Atom,
}

impl Atoms {
    /// Resolve the fixed atom set in one batch.
    pub fn resolve<C: Connection>(conn: &C) -> Self {
        Self {
            wm_protocols: resolve_atom(conn, "WM_PROTOCOLS"),
            wm_delete_window: resolve_atom(conn, "WM_DELETE_WINDOW"),
            net_wm_ping: resolve_atom(conn, "_NET_WM_PING"),
            net_wm_state: resolve_atom(conn, "_NET_WM_STATE"),
            net_wm_state_fullscreen: resolve_atom(conn, "_NET_WM_STATE_FULLSCREEN"),
            net_wm_state_maximized_horz: resolve_atom(conn, "_NET_WM_STATE_MAXIMIZED_HORZ"),
            net_wm_state_maximized_vert: resolve_atom(conn, "_NET_WM_STATE_MAXIMIZED_VERT"),
            net_request_frame_extents: resolve_atom(conn, "_NET_REQUEST_FRAME_EXTENTS"),
            net_frame_extents: resolve_atom(conn, "_NET_FRAME_EXTENTS"),
            net_wm_pid: resolve_atom(conn, "_NET_WM_PID"),
            net_wm_bypass_compositor: resolve_atom(conn, "_NET_WM_BYPASS_COMPOSITOR"),
            net_active_window: resolve_atom(conn, "_NET_ACTIVE_WINDOW"),
        }
    }
}

/// `true` when `atom` resolved to a real identifier.
pub(crate) fn resolved(atom: Atom) -> bool {
    atom != x11rb::NONE
}

fn resolve_atom<C: Connection>(conn: &C, name: &str) -> Atom {
    let cookie = match conn.intern_atom(false, name.as_bytes()) {
        Ok(cookie) => cookie,
        Err(e) => {
            warn!("Unable to request '{}' atom: {}", name, e);
            return x11rb::NONE;
        }
    };
    match cookie.reply() {
        Ok(reply) => reply.atom,
        Err(e) => {
            warn!("Unable to query '{}' atom: {}", name, e);
            x11rb::NONE
        }
    }
}
