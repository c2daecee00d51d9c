use std::time::Duration;

use enigo::{Button, Coordinate, Direction, Enigo, Keyboard, Mouse, Settings};
use serde::Deserialize;

use crate::config::AppConfig;
use crate::errors::{DeskhandError, DeskhandResult};
use crate::executor::result::ToolResult;
use crate::perception::scaling::{scale_point, Resolution, ScaledPoint};
use crate::perception::screenshot::{capture_primary, primary_resolution};

/// Characters injected per `type` chunk before a short pause.
const TYPE_CHUNK_CHARS: usize = 50;
const TYPE_CHUNK_PAUSE: Duration = Duration::from_millis(25);
const DRAG_STEP_PAUSE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputerAction {
    Key,
    Type,
    MouseMove,
    LeftClick,
    LeftClickDrag,
    RightClick,
    MiddleClick,
    DoubleClick,
    Screenshot,
    CursorPosition,
}

/// Raw tool input as sent by the model.
#[derive(Debug, Clone, Deserialize)]
pub struct ComputerArgs {
    pub action: ComputerAction,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub coordinate: Option<Vec<i64>>,
}

/// Validated operation; coordinates are still in the virtual space.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Op {
    Key(String),
    Type(String),
    MouseMove { x: i32, y: i32 },
    LeftClickDrag { x: i32, y: i32 },
    Click(ClickKind),
    Screenshot,
    CursorPosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClickKind {
    Left,
    Right,
    Middle,
    Double,
}

impl ClickKind {
    fn describe(self) -> &'static str {
        match self {
            Self::Left => "Left click",
            Self::Right => "Right click",
            Self::Middle => "Middle click",
            Self::Double => "Double click",
        }
    }
}

/// Pointer/keyboard actuator. The model addresses the screen in a fixed
/// virtual resolution; every coordinate is rescaled to physical pixels
/// before injection, and every action except `cursor_position` is
/// followed by a capture of the resulting screen state.
pub struct ComputerTool {
    virtual_res: Resolution,
    action_delay: Duration,
    settle_delay: Duration,
}

impl ComputerTool {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            virtual_res: config.screen.virtual_resolution(),
            action_delay: Duration::from_millis(config.agent.action_delay_ms),
            settle_delay: Duration::from_millis(config.agent.settle_delay_ms),
        }
    }

    pub async fn run(&self, args: ComputerArgs) -> DeskhandResult<ToolResult> {
        let op = self.validate(args)?;

        // Interruption window: the human can still grab the mouse.
        if !self.action_delay.is_zero() {
            tokio::time::sleep(self.action_delay).await;
        }

        self.dispatch(op).await.map_err(DeskhandError::into_tool)
    }

    fn validate(&self, args: ComputerArgs) -> DeskhandResult<Op> {
        let ComputerArgs {
            action,
            text,
            coordinate,
        } = args;

        let text_required = matches!(action, ComputerAction::Key | ComputerAction::Type);
        let coord_required = matches!(
            action,
            ComputerAction::MouseMove | ComputerAction::LeftClickDrag
        );

        if !text_required && text.is_some() {
            return Err(DeskhandError::tool(format!(
                "`text` is not accepted for action {action:?}"
            )));
        }
        if !coord_required && coordinate.is_some() {
            return Err(DeskhandError::tool(format!(
                "`coordinate` is not accepted for action {action:?}"
            )));
        }

        let text = if text_required {
            let t = text.ok_or_else(|| {
                DeskhandError::tool(format!("`text` is required for action {action:?}"))
            })?;
            Some(t)
        } else {
            None
        };

        let point = if coord_required {
            let coord = coordinate.ok_or_else(|| {
                DeskhandError::tool(format!("`coordinate` is required for action {action:?}"))
            })?;
            Some(self.validate_coordinate(&coord)?)
        } else {
            None
        };

        Ok(match action {
            ComputerAction::Key => Op::Key(text.unwrap_or_default()),
            ComputerAction::Type => Op::Type(text.unwrap_or_default()),
            ComputerAction::MouseMove => {
                let (x, y) = point.unwrap_or_default();
                Op::MouseMove { x, y }
            }
            ComputerAction::LeftClickDrag => {
                let (x, y) = point.unwrap_or_default();
                Op::LeftClickDrag { x, y }
            }
            ComputerAction::LeftClick => Op::Click(ClickKind::Left),
            ComputerAction::RightClick => Op::Click(ClickKind::Right),
            ComputerAction::MiddleClick => Op::Click(ClickKind::Middle),
            ComputerAction::DoubleClick => Op::Click(ClickKind::Double),
            ComputerAction::Screenshot => Op::Screenshot,
            ComputerAction::CursorPosition => Op::CursorPosition,
        })
    }

    fn validate_coordinate(&self, coord: &[i64]) -> DeskhandResult<(i32, i32)> {
        let &[x, y] = coord else {
            return Err(DeskhandError::tool(format!(
                "`coordinate` must be a pair [x, y], got {coord:?}"
            )));
        };
        if x < 0 || y < 0 {
            return Err(DeskhandError::tool(format!(
                "`coordinate` must be non-negative, got [{x}, {y}]"
            )));
        }
        if x > self.virtual_res.width as i64 || y > self.virtual_res.height as i64 {
            return Err(DeskhandError::tool(format!(
                "Coordinates [{x}, {y}] are out of bounds for {}",
                self.virtual_res
            )));
        }
        Ok((x as i32, y as i32))
    }

    async fn dispatch(&self, op: Op) -> DeskhandResult<ToolResult> {
        match op {
            Op::Screenshot => {
                let shot = capture_primary(self.virtual_res).await?;
                Ok(ToolResult::default().with_image(shot.image_base64))
            }
            Op::CursorPosition => {
                let (x, y) = with_enigo(|enigo| {
                    enigo
                        .location()
                        .map_err(|e| DeskhandError::Input(format!("cursor query: {e}")))
                })
                .await?;
                let physical = primary_resolution()?;
                let p = scale_point(x, y, physical, self.virtual_res);
                Ok(ToolResult::default().with_output(format!("X={},Y={}", p.x, p.y)))
            }
            op => {
                let note = self.perform(op).await?;
                tokio::time::sleep(self.settle_delay).await;
                let shot = capture_primary(self.virtual_res).await?;
                Ok(ToolResult::default()
                    .with_output(note)
                    .with_image(shot.image_base64))
            }
        }
    }

    /// Inject one input primitive; returns the confirmation text.
    async fn perform(&self, op: Op) -> DeskhandResult<String> {
        match op {
            Op::Key(spec) => {
                let (modifiers, key) = parse_key_combo(&spec)?;
                with_enigo(move |enigo| {
                    for m in &modifiers {
                        enigo.key(*m, Direction::Press).map_err(input_err)?;
                    }
                    enigo.key(key, Direction::Click).map_err(input_err)?;
                    for m in modifiers.iter().rev() {
                        enigo.key(*m, Direction::Release).map_err(input_err)?;
                    }
                    Ok(())
                })
                .await?;
                Ok(format!("Pressed key: {spec}"))
            }
            Op::Type(text) => {
                let chars = text.chars().count();
                with_enigo(move |enigo| {
                    let mut buf = String::with_capacity(TYPE_CHUNK_CHARS);
                    let mut pending = text.chars().peekable();
                    while pending.peek().is_some() {
                        buf.clear();
                        buf.extend(pending.by_ref().take(TYPE_CHUNK_CHARS));
                        enigo.text(&buf).map_err(input_err)?;
                        std::thread::sleep(TYPE_CHUNK_PAUSE);
                    }
                    Ok(())
                })
                .await?;
                Ok(format!("Typed {chars} characters"))
            }
            Op::MouseMove { x, y } => {
                let p = self.to_physical(x, y)?;
                with_enigo(move |enigo| {
                    enigo
                        .move_mouse(p.x, p.y, Coordinate::Abs)
                        .map_err(input_err)
                })
                .await?;
                Ok(format!("Moved cursor to ({x}, {y})"))
            }
            Op::LeftClickDrag { x, y } => {
                let p = self.to_physical(x, y)?;
                with_enigo(move |enigo| {
                    enigo.button(Button::Left, Direction::Press).map_err(input_err)?;
                    std::thread::sleep(DRAG_STEP_PAUSE);
                    enigo
                        .move_mouse(p.x, p.y, Coordinate::Abs)
                        .map_err(input_err)?;
                    std::thread::sleep(DRAG_STEP_PAUSE);
                    enigo
                        .button(Button::Left, Direction::Release)
                        .map_err(input_err)
                })
                .await?;
                Ok(format!("Dragged to ({x}, {y})"))
            }
            Op::Click(kind) => {
                with_enigo(move |enigo| {
                    let button = match kind {
                        ClickKind::Left | ClickKind::Double => Button::Left,
                        ClickKind::Right => Button::Right,
                        ClickKind::Middle => Button::Middle,
                    };
                    enigo.button(button, Direction::Click).map_err(input_err)?;
                    if kind == ClickKind::Double {
                        std::thread::sleep(Duration::from_millis(100));
                        enigo.button(button, Direction::Click).map_err(input_err)?;
                    }
                    Ok(())
                })
                .await?;
                Ok(kind.describe().to_string())
            }
            Op::Screenshot | Op::CursorPosition => unreachable!("handled in dispatch"),
        }
    }

    fn to_physical(&self, x: i32, y: i32) -> DeskhandResult<ScaledPoint> {
        let physical = primary_resolution()?;
        Ok(scale_point(x, y, self.virtual_res, physical))
    }
}

/// Run an input-injection closure on the blocking pool with a fresh
/// enigo handle (the handle is not Send on every platform).
async fn with_enigo<T, F>(f: F) -> DeskhandResult<T>
where
    T: Send + 'static,
    F: FnOnce(&mut Enigo) -> DeskhandResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut enigo = Enigo::new(&Settings::default())
            .map_err(|e| DeskhandError::Input(format!("input backend init: {e}")))?;
        f(&mut enigo)
    })
    .await
    .map_err(|e| DeskhandError::Input(format!("input task panicked: {e}")))?
}

fn input_err(e: enigo::InputError) -> DeskhandError {
    DeskhandError::Input(e.to_string())
}

/// Parse an xdotool-style key spec (`Return`, `ctrl+s`, `alt+Tab`) into
/// modifier keys plus the main key.
fn parse_key_combo(spec: &str) -> DeskhandResult<(Vec<enigo::Key>, enigo::Key)> {
    let parts: Vec<&str> = spec.split('+').map(str::trim).collect();
    let (&main, modifiers) = parts
        .split_last()
        .filter(|(main, _)| !main.is_empty())
        .ok_or_else(|| DeskhandError::tool(format!("empty key spec: `{spec}`")))?;

    let mods = modifiers
        .iter()
        .map(|m| parse_modifier(m))
        .collect::<DeskhandResult<Vec<_>>>()?;
    Ok((mods, parse_key(main)?))
}

fn parse_modifier(name: &str) -> DeskhandResult<enigo::Key> {
    use enigo::Key;
    Ok(match name.to_ascii_lowercase().as_str() {
        "ctrl" | "control" => Key::Control,
        "alt" => Key::Alt,
        "shift" => Key::Shift,
        "super" | "meta" | "cmd" | "win" => Key::Meta,
        other => {
            return Err(DeskhandError::tool(format!(
                "unsupported modifier key: `{other}`"
            )))
        }
    })
}

fn parse_key(name: &str) -> DeskhandResult<enigo::Key> {
    use enigo::Key;
    let lower = name.to_ascii_lowercase();
    Ok(match lower.as_str() {
        "return" | "enter" | "kp_enter" => Key::Return,
        "tab" => Key::Tab,
        "escape" | "esc" => Key::Escape,
        "space" => Key::Space,
        "backspace" => Key::Backspace,
        "delete" | "del" => Key::Delete,
        "home" => Key::Home,
        "end" => Key::End,
        "page_up" | "pageup" | "prior" => Key::PageUp,
        "page_down" | "pagedown" | "next" => Key::PageDown,
        "up" => Key::UpArrow,
        "down" => Key::DownArrow,
        "left" => Key::LeftArrow,
        "right" => Key::RightArrow,
        "f1" => Key::F1,
        "f2" => Key::F2,
        "f3" => Key::F3,
        "f4" => Key::F4,
        "f5" => Key::F5,
        "f6" => Key::F6,
        "f7" => Key::F7,
        "f8" => Key::F8,
        "f9" => Key::F9,
        "f10" => Key::F10,
        "f11" => Key::F11,
        "f12" => Key::F12,
        _ => {
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Key::Unicode(c),
                _ => {
                    return Err(DeskhandError::tool(format!("unsupported key: `{name}`")));
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> ComputerTool {
        ComputerTool::new(&AppConfig::default())
    }

    fn args(action: ComputerAction) -> ComputerArgs {
        ComputerArgs {
            action,
            text: None,
            coordinate: None,
        }
    }

    #[test]
    fn key_requires_text() {
        let err = tool().validate(args(ComputerAction::Key)).unwrap_err();
        assert!(err.to_string().contains("`text` is required"));
    }

    #[test]
    fn click_rejects_coordinate() {
        let mut a = args(ComputerAction::LeftClick);
        a.coordinate = Some(vec![10, 10]);
        let err = tool().validate(a).unwrap_err();
        assert!(err.to_string().contains("not accepted"));
    }

    #[test]
    fn mouse_move_validates_coordinate_shape() {
        let mut a = args(ComputerAction::MouseMove);
        a.coordinate = Some(vec![10]);
        assert!(tool().validate(a).is_err());

        let mut a = args(ComputerAction::MouseMove);
        a.coordinate = Some(vec![-5, 10]);
        let err = tool().validate(a).unwrap_err();
        assert!(err.to_string().contains("non-negative"));

        let mut a = args(ComputerAction::MouseMove);
        a.coordinate = Some(vec![5000, 10]);
        let err = tool().validate(a).unwrap_err();
        assert!(err.to_string().contains("out of bounds"));

        let mut a = args(ComputerAction::MouseMove);
        a.coordinate = Some(vec![640, 400]);
        assert_eq!(
            tool().validate(a).unwrap(),
            Op::MouseMove { x: 640, y: 400 }
        );
    }

    #[test]
    fn screenshot_takes_no_arguments() {
        assert_eq!(
            tool().validate(args(ComputerAction::Screenshot)).unwrap(),
            Op::Screenshot
        );
        let mut a = args(ComputerAction::Screenshot);
        a.text = Some("x".into());
        assert!(tool().validate(a).is_err());
    }

    #[test]
    fn key_combo_parsing() {
        use enigo::Key;
        let (mods, key) = parse_key_combo("ctrl+shift+s").unwrap();
        assert_eq!(mods, vec![Key::Control, Key::Shift]);
        assert_eq!(key, Key::Unicode('s'));

        let (mods, key) = parse_key_combo("Return").unwrap();
        assert!(mods.is_empty());
        assert_eq!(key, Key::Return);

        let (_, key) = parse_key_combo("Page_Down").unwrap();
        assert_eq!(key, Key::PageDown);

        assert!(parse_key_combo("ctrl+").is_err());
        assert!(parse_key_combo("bogus_key").is_err());
    }

    #[test]
    fn action_names_deserialize_snake_case() {
        let a: ComputerArgs = serde_json::from_value(serde_json::json!({
            "action": "left_click_drag",
            "coordinate": [100, 200],
        }))
        .unwrap();
        assert_eq!(a.action, ComputerAction::LeftClickDrag);
    }
}
