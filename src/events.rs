//! Translation of raw X events into window lifecycle notifications.

use tracing::debug;
use x11rb::protocol::Event;
use x11rb::protocol::xproto::{ClientMessageEvent, Window};

use crate::atoms::{Atoms, resolved};
use crate::shared::WindowHandle;
use crate::window::{CLIENT_MESSAGE_FORMAT, NativeWindow};

/// Notifications the controller emits toward the windowing abstraction.
///
/// `window_closed`, `window_resized` and `resolution_changed` are delivered
/// only while the window is activated, addressed by its [`WindowHandle`].
/// `exit_main_loop` asks the owning application to leave its main loop after
/// a window-manager close request; it is a control request, not a window
/// notification.
pub trait WindowEventHandler {
    fn window_closed(&mut self, window: WindowHandle);
    fn window_resized(&mut self, window: WindowHandle, width: u32, height: u32);
    fn resolution_changed(&mut self, window: WindowHandle, width: u32, height: u32);
    fn exit_main_loop(&mut self);
}

/// Requests a `WM_PROTOCOLS` client message can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WmProtocolMessage {
    CloseRequested,
    Ping,
}

/// Decide what a client message asks for. Messages with an unexpected type,
/// format, or payload atom yield `None` and are dropped by the dispatcher.
/// A ping whose embedded window is the root is also dropped, so the reply
/// can never loop back to us.
pub(crate) fn classify_protocol_message(
    event: &ClientMessageEvent,
    atoms: &Atoms,
    root: Window,
) -> Option<WmProtocolMessage> {
    if !resolved(atoms.wm_protocols)
        || event.type_ != atoms.wm_protocols
        || event.format != CLIENT_MESSAGE_FORMAT
    {
        return None;
    }

    let protocol = event.data.as_data32()[0];
    if resolved(atoms.wm_delete_window) && protocol == atoms.wm_delete_window {
        Some(WmProtocolMessage::CloseRequested)
    } else if resolved(atoms.net_wm_ping) && protocol == atoms.net_wm_ping && event.window != root {
        Some(WmProtocolMessage::Ping)
    } else {
        None
    }
}

impl NativeWindow {
    /// Route one raw protocol event. Unrecognized event kinds and payload
    /// atoms are ignored without a notification.
    pub fn handle_event<H: WindowEventHandler>(&mut self, event: &Event, handler: &mut H) {
        match event {
            Event::ConfigureNotify(configure) => {
                let width = u32::from(configure.width);
                let height = u32::from(configure.height);
                let size = self.size();
                if width != size.width || height != size.height {
                    self.window_size_changed(width, height, handler);
                }
            }
            Event::ClientMessage(message) => {
                match classify_protocol_message(message, self.atoms(), self.root()) {
                    Some(WmProtocolMessage::CloseRequested) => {
                        debug!("Window manager requested close");
                        self.deactivate(handler);
                        handler.exit_main_loop();
                    }
                    Some(WmProtocolMessage::Ping) => self.reply_to_ping(message),
                    None => {}
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use x11rb::protocol::xproto::CLIENT_MESSAGE_EVENT;

    const ROOT: Window = 1;
    const WINDOW: Window = 7;

    fn atoms() -> Atoms {
        Atoms {
            wm_protocols: 100,
            wm_delete_window: 101,
            net_wm_ping: 102,
            ..Atoms::default()
        }
    }

    fn protocol_message(window: Window, type_: u32, payload: u32, format: u8) -> ClientMessageEvent {
        ClientMessageEvent {
            response_type: CLIENT_MESSAGE_EVENT,
            format,
            sequence: 0,
            window,
            type_,
            data: [payload, 0, 0, 0, 0].into(),
        }
    }

    #[test]
    fn delete_window_payload_is_a_close_request() {
        let message = protocol_message(WINDOW, 100, 101, 32);
        assert_eq!(
            classify_protocol_message(&message, &atoms(), ROOT),
            Some(WmProtocolMessage::CloseRequested)
        );
    }

    #[test]
    fn ping_from_non_root_window_wants_a_reply() {
        let message = protocol_message(WINDOW, 100, 102, 32);
        assert_eq!(
            classify_protocol_message(&message, &atoms(), ROOT),
            Some(WmProtocolMessage::Ping)
        );
    }

    #[test]
    fn ping_embedding_the_root_window_is_dropped() {
        let message = protocol_message(ROOT, 100, 102, 32);
        assert_eq!(classify_protocol_message(&message, &atoms(), ROOT), None);
    }

    #[test]
    fn unknown_payload_atom_is_ignored() {
        let message = protocol_message(WINDOW, 100, 9999, 32);
        assert_eq!(classify_protocol_message(&message, &atoms(), ROOT), None);
    }

    #[test]
    fn wrong_format_is_ignored() {
        let message = protocol_message(WINDOW, 100, 101, 8);
        assert_eq!(classify_protocol_message(&message, &atoms(), ROOT), None);
    }

    #[test]
    fn non_protocol_message_type_is_ignored() {
        let message = protocol_message(WINDOW, 555, 101, 32);
        assert_eq!(classify_protocol_message(&message, &atoms(), ROOT), None);
    }

    #[test]
    fn unresolved_protocol_atoms_disable_classification() {
        let message = protocol_message(WINDOW, 0, 0, 32);
        assert_eq!(
            classify_protocol_message(&message, &Atoms::default(), ROOT),
            None
        );
    }
}
