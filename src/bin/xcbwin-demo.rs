//! Opens a window over a fresh X11 connection and pumps events until the
//! window manager asks it to close.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use x11rb::connection::Connection;

use xcbwin::{Config, Geometry, NativeWindow, StyleMask, WindowEventHandler, WindowHandle};

struct DemoHandler {
    exit: bool,
}

impl WindowEventHandler for DemoHandler {
    fn window_closed(&mut self, window: WindowHandle) {
        info!("Window {:?} closed", window);
    }

    fn window_resized(&mut self, _window: WindowHandle, width: u32, height: u32) {
        info!("Window resized to {}x{}", width, height);
    }

    fn resolution_changed(&mut self, _window: WindowHandle, width: u32, height: u32) {
        debug!("Resolution now {}x{}", width, height);
    }

    fn exit_main_loop(&mut self) {
        self.exit = true;
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load configuration")?;

    let (conn, screen_num) = x11rb::connect(None).context("Failed to connect to X server")?;
    let conn = Arc::new(conn);
    info!("Connected to X server, screen {}", screen_num);

    let mut window = NativeWindow::new(conn.clone(), screen_num, config.splash);
    window.init_window(
        "xcbwin demo",
        Geometry::new(0, 0, 1280, 720),
        StyleMask::BORDERED | StyleMask::RESIZEABLE,
    )?;
    window.activate();

    let mut handler = DemoHandler { exit: false };
    while !handler.exit {
        let event = conn
            .wait_for_event()
            .context("Lost connection to X server")?;
        window.handle_event(&event, &mut handler);
    }

    Ok(())
}
