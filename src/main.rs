// ── casement-runner ───────────────────────────────────────────────────────────
//
// On Windows: open the main window over the real window manager and pump
// messages until the last window is gone.
//
// Elsewhere: serve the windowing channel over stdio against the headless
// platform, one JSON method call per input line, one reply per output line.

// Release builds run as a GUI application (no console window).
#![cfg_attr(all(windows, not(debug_assertions)), windows_subsystem = "windows")]

use casement::HostConfig;
use tracing::error;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    let config = HostConfig::load_or_default();
    if let Err(e) = run(config) {
        error!(error = %e, "runner failed");
        #[cfg(windows)]
        casement::platform::win32::show_error_dialog(&e.to_string());
        std::process::exit(1);
    }
}

#[cfg(windows)]
fn run(config: HostConfig) -> casement::Result<()> {
    use std::rc::Rc;

    use casement::{
        geometry::Size,
        platform::win32::{message_loop, post_quit, Win32Platform},
        view::InertViews,
        HostWindowController, WindowCreationSettings, WindowEvent, WindowSizing,
    };
    use tracing::info;

    let platform = Rc::new(Win32Platform::new(&config)?);
    let controller = HostWindowController::new(platform, Rc::new(InertViews::new()), config);

    let weak = Rc::downgrade(&controller);
    controller.set_event_listener(Some(Rc::new(move |event: &WindowEvent| {
        if let WindowEvent::Destroyed { view_id } = event {
            info!(view_id, "window closed");
            if weak.upgrade().is_some_and(|c| !c.has_top_level_windows()) {
                post_quit();
            }
        }
    })));

    let sizing = WindowSizing::new(Size::new(960.0, 640.0)).with_min(Size::new(320.0, 240.0));
    controller.create_window(&WindowCreationSettings::regular(sizing))?;
    message_loop()
}

#[cfg(not(windows))]
fn run(config: HostConfig) -> casement::Result<()> {
    use std::{
        io::{BufRead, Write},
        rc::Rc,
    };

    use casement::{
        channel::{MethodCall, WindowingHandler, CHANNEL_NAME},
        platform::headless::HeadlessPlatform,
        view::InertViews,
        HostWindowController,
    };
    use tracing::info;

    let platform = Rc::new(HeadlessPlatform::new());
    let controller = HostWindowController::new(platform, Rc::new(InertViews::new()), config);
    let handler = WindowingHandler::new(
        controller,
        Rc::new(|call: MethodCall| {
            info!(method = %call.method, arguments = %call.arguments, "notification");
        }),
    );
    info!(channel = CHANNEL_NAME, "serving headless windowing channel on stdio");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for line in std::io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match handler.handle_json(&line) {
            Ok(reply) => writeln!(out, "{reply}")?,
            Err(e) => error!(error = %e, "undecodable request"),
        }
    }
    Ok(())
}
