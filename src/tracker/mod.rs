//! Global click tracker: reports where clicks land on the physical
//! screen and where they map to in the virtual resolution.

use std::sync::mpsc;
use std::time::Duration;

use rdev::{Event, EventType, Key};
use tokio_util::sync::CancellationToken;

use crate::errors::{DeskhandError, DeskhandResult};
use crate::perception::scaling::{scale_point, Resolution, ScaledPoint};
use crate::perception::screenshot::primary_resolution;

enum TrackerEvent {
    Click { x: f64, y: f64 },
    Quit,
    Failed(String),
}

/// Listen for global clicks until Escape is pressed or `token` is
/// cancelled externally. One line is printed per click.
///
/// The cancellation token is shared with the listener callback: once
/// cancelled, the callback becomes a no-op, so a late event cannot
/// produce output after shutdown has begun.
pub fn run(target: Resolution, token: CancellationToken) -> DeskhandResult<()> {
    let screen = primary_resolution()?;
    println!("Tracking clicks: screen {screen}, target {target}. Press Esc to stop.");

    let (tx, rx) = mpsc::channel();
    let listener_token = token.clone();
    std::thread::spawn(move || {
        let tx_listen = tx.clone();
        let cb_token = listener_token.clone();
        let mut last = (0.0_f64, 0.0_f64);
        let outcome = rdev::listen(move |event: Event| {
            if cb_token.is_cancelled() {
                return;
            }
            match event.event_type {
                EventType::MouseMove { x, y } => last = (x, y),
                EventType::ButtonPress(_) => {
                    let _ = tx_listen.send(TrackerEvent::Click {
                        x: last.0,
                        y: last.1,
                    });
                }
                EventType::KeyPress(Key::Escape) => {
                    cb_token.cancel();
                    let _ = tx_listen.send(TrackerEvent::Quit);
                }
                _ => {}
            }
        });
        if let Err(e) = outcome {
            listener_token.cancel();
            let _ = tx.send(TrackerEvent::Failed(format!("{e:?}")));
        }
    });

    loop {
        if token.is_cancelled() {
            // Cancelled externally (e.g. Ctrl+C); drain nothing further.
            match rx.try_recv() {
                Ok(TrackerEvent::Failed(msg)) => return Err(DeskhandError::Tracker(msg)),
                _ => break,
            }
        }
        match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(TrackerEvent::Click { x, y }) => report_click(x, y, screen, target),
            Ok(TrackerEvent::Quit) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
            Ok(TrackerEvent::Failed(msg)) => return Err(DeskhandError::Tracker(msg)),
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
        }
    }

    println!("Tracker stopped.");
    Ok(())
}

fn report_click(x: f64, y: f64, screen: Resolution, target: Resolution) {
    let raw_x = x as i32;
    let raw_y = y as i32;
    let scaled = scale_point(raw_x, raw_y, screen, target);

    // Best-effort enrichment; a failed lookup is logged, never fatal.
    let window = match window_at(raw_x, raw_y) {
        Ok(title) => title,
        Err(e) => {
            tracing::warn!(error = %e, "window lookup failed");
            None
        }
    };

    println!("{}", format_report(raw_x, raw_y, scaled, window.as_deref()));
}

/// Title of the topmost window containing the point, if any.
fn window_at(x: i32, y: i32) -> DeskhandResult<Option<String>> {
    let windows = xcap::Window::all()
        .map_err(|e| DeskhandError::Tracker(format!("window enumeration: {e}")))?;
    Ok(windows
        .into_iter()
        .find(|w| {
            !w.is_minimized()
                && x >= w.x()
                && y >= w.y()
                && x < w.x() + w.width() as i32
                && y < w.y() + w.height() as i32
        })
        .map(|w| w.title().to_string()))
}

fn format_report(raw_x: i32, raw_y: i32, scaled: ScaledPoint, window: Option<&str>) -> String {
    let mut line = format!(
        "raw ({raw_x}, {raw_y}) -> scaled ({}, {})",
        scaled.x, scaled.y
    );
    if let Some(title) = window {
        line.push_str(&format!("  [{title}]"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_line_carries_raw_and_scaled_values() {
        let scaled = scale_point(
            1920,
            1080,
            Resolution::new(1920, 1080),
            Resolution::new(1280, 800),
        );
        let line = format_report(1920, 1080, scaled, None);
        assert_eq!(line, "raw (1920, 1080) -> scaled (1280, 800)");

        let line = format_report(10, 20, ScaledPoint { x: 7, y: 15 }, Some("Terminal"));
        assert!(line.ends_with("[Terminal]"));
    }
}
