//! Last-confirmed display state for the managed window.

use x11rb::protocol::xproto::Atom;

use crate::atoms::Atoms;
use crate::events::WindowEventHandler;
use crate::shared::{Geometry, WindowHandle};

/// State the window manager has confirmed, plus the activation gate.
///
/// `fullscreen` and the maximize flags mirror the manager's `_NET_WM_STATE`
/// reply, not the last request this controller sent. `geometry` holds the
/// size last confirmed by a configure event, not the last size requested.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct WindowState {
    pub geometry: Geometry,
    pub fullscreen: bool,
    pub maximized_horz: bool,
    pub maximized_vert: bool,
    pub activated: bool,
    pub customized_resolution: bool,
}

impl WindowState {
    /// Rebuild all state flags from a `_NET_WM_STATE` reply. Flags absent
    /// from the returned list are cleared; a partial update never survives.
    pub(crate) fn rebuild_wm_flags(&mut self, states: &[Atom], atoms: &Atoms) {
        self.fullscreen = false;
        self.maximized_horz = false;
        self.maximized_vert = false;

        for &state in states {
            if state == atoms.net_wm_state_fullscreen {
                self.fullscreen = true;
            } else if state == atoms.net_wm_state_maximized_horz {
                self.maximized_horz = true;
            } else if state == atoms.net_wm_state_maximized_vert {
                self.maximized_vert = true;
            }
        }
    }

    /// Record a confirmed client-area size, notifying only when it actually
    /// changed and only while the window is activated. The stored size is
    /// updated before any notification goes out.
    pub(crate) fn confirm_size<H: WindowEventHandler>(
        &mut self,
        handle: WindowHandle,
        width: u32,
        height: u32,
        handler: &mut H,
    ) {
        if self.geometry.width == width && self.geometry.height == height {
            return;
        }
        self.geometry.width = width;
        self.geometry.height = height;

        if !self.activated {
            return;
        }
        handler.window_resized(handle, width, height);
        if !self.customized_resolution {
            handler.resolution_changed(handle, width, height);
        }
    }

    /// Emit the close notification and clear the activation flag. The
    /// notification goes out while the window still counts as activated.
    /// Returns whether the window was activated, in which case the caller
    /// unmaps it.
    pub(crate) fn deactivate<H: WindowEventHandler>(
        &mut self,
        handle: WindowHandle,
        handler: &mut H,
    ) -> bool {
        if !self.activated {
            return false;
        }
        handler.window_closed(handle);
        self.activated = false;
        true
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{Recorded, Recorder};
    use super::*;

    fn atoms() -> Atoms {
        Atoms {
            net_wm_state_fullscreen: 301,
            net_wm_state_maximized_horz: 302,
            net_wm_state_maximized_vert: 303,
            ..Atoms::default()
        }
    }

    fn handle() -> WindowHandle {
        WindowHandle::from_xid(42)
    }

    #[test]
    fn rebuild_sets_exactly_the_reported_flags() {
        let mut state = WindowState::default();
        state.rebuild_wm_flags(&[301, 302], &atoms());
        assert!(state.fullscreen);
        assert!(state.maximized_horz);
        assert!(!state.maximized_vert);
    }

    #[test]
    fn rebuild_clears_flags_missing_from_reply() {
        let mut state = WindowState {
            fullscreen: true,
            maximized_horz: true,
            maximized_vert: true,
            ..WindowState::default()
        };
        state.rebuild_wm_flags(&[303], &atoms());
        assert!(!state.fullscreen);
        assert!(!state.maximized_horz);
        assert!(state.maximized_vert);
    }

    #[test]
    fn unrelated_state_atoms_are_ignored() {
        let mut state = WindowState::default();
        state.rebuild_wm_flags(&[999, 1000], &atoms());
        assert!(!state.fullscreen && !state.maximized_horz && !state.maximized_vert);
    }

    #[test]
    fn confirm_size_notifies_once_per_change() {
        let mut state = WindowState {
            activated: true,
            geometry: Geometry::new(0, 0, 800, 600),
            ..WindowState::default()
        };
        let mut recorder = Recorder::default();

        state.confirm_size(handle(), 1024, 768, &mut recorder);
        state.confirm_size(handle(), 1024, 768, &mut recorder);

        assert_eq!(
            recorder.events,
            vec![
                Recorded::Resized(1024, 768),
                Recorded::ResolutionChanged(1024, 768),
            ]
        );
        assert_eq!(state.geometry.width, 1024);
        assert_eq!(state.geometry.height, 768);
    }

    #[test]
    fn confirm_size_with_unchanged_size_is_silent() {
        let mut state = WindowState {
            activated: true,
            geometry: Geometry::new(0, 0, 800, 600),
            ..WindowState::default()
        };
        let mut recorder = Recorder::default();

        state.confirm_size(handle(), 800, 600, &mut recorder);
        assert!(recorder.events.is_empty());
    }

    #[test]
    fn customized_resolution_suppresses_resolution_notification() {
        let mut state = WindowState {
            activated: true,
            customized_resolution: true,
            geometry: Geometry::new(0, 0, 800, 600),
            ..WindowState::default()
        };
        let mut recorder = Recorder::default();

        state.confirm_size(handle(), 640, 480, &mut recorder);
        assert_eq!(recorder.events, vec![Recorded::Resized(640, 480)]);
    }

    #[test]
    fn inactive_window_stores_size_without_notifying() {
        let mut state = WindowState {
            geometry: Geometry::new(0, 0, 800, 600),
            ..WindowState::default()
        };
        let mut recorder = Recorder::default();

        state.confirm_size(handle(), 640, 480, &mut recorder);
        assert!(recorder.events.is_empty());
        assert_eq!(state.geometry.width, 640);
    }

    #[test]
    fn deactivate_notifies_then_clears_flag() {
        let mut state = WindowState {
            activated: true,
            ..WindowState::default()
        };
        let mut recorder = Recorder::default();

        assert!(state.deactivate(handle(), &mut recorder));
        assert_eq!(recorder.events, vec![Recorded::Closed]);
        assert!(!state.activated);

        // A second deactivation is a no-op.
        assert!(!state.deactivate(handle(), &mut recorder));
        assert_eq!(recorder.events, vec![Recorded::Closed]);
    }
}
