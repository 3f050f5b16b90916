//! Console rendering of session progress.

use agent_provider::{Message, Part, Role};
use agent_transcript::SessionEvent;
use serde_json::{Map, Value};

/// Lines to print for one session event. Most events print nothing.
pub fn render_event(event: &SessionEvent) -> Vec<String> {
    match event {
        SessionEvent::MessageAppended(message) => render_message(message),
        SessionEvent::ImagesEvicted(_) => Vec::new(),
        SessionEvent::Notice(notice) => vec![format!("! {}", notice.message())],
    }
}

fn render_message(message: &Message) -> Vec<String> {
    let mut lines = Vec::new();
    match message.role {
        Role::Assistant => {
            let text = message.text();
            if !text.trim().is_empty() {
                lines.push(text.trim_end().to_string());
            }
            for part in &message.content {
                if let Part::ToolCall {
                    tool_name, args, ..
                } = part
                {
                    lines.push(describe_tool_call(tool_name, args));
                }
            }
        }
        Role::Tool => {
            for part in &message.content {
                if let Part::ToolResult {
                    tool_name, result, ..
                } = part
                {
                    if let Some(error) = result.error.as_deref().filter(|error| !error.is_empty()) {
                        lines.push(format!("! {tool_name}: {}", error.trim_end()));
                    }
                }
            }
        }
        Role::User => {}
    }
    lines
}

pub fn describe_tool_call(tool_name: &str, args: &Map<String, Value>) -> String {
    match tool_name {
        "computer" => describe_computer_action(args),
        "bash" => match args.get("command").and_then(Value::as_str) {
            Some(command) => format!("$ {command}"),
            None => "$".to_string(),
        },
        other => format!("{other} → {}", describe_args(args)),
    }
}

/// Human-readable form of one `computer` tool call.
pub fn describe_computer_action(args: &Map<String, Value>) -> String {
    let Some(action) = args.get("action").and_then(Value::as_str) else {
        return format!("computer: {}", describe_args(args));
    };
    let target = point(args.get("coordinates").or_else(|| args.get("coordinate")));
    let at = target
        .map(|(x, y)| format!(" at ({x}, {y})"))
        .unwrap_or_default();

    match action {
        "move_mouse" | "mouse_move" => match target {
            Some((x, y)) => format!("Moving mouse to ({x}, {y})"),
            None => "Moving mouse".to_string(),
        },
        "click_mouse" => {
            let clicks = args.get("num_clicks").and_then(Value::as_u64).unwrap_or(1);
            let count = if clicks > 1 { format!("{clicks}x ") } else { String::new() };
            let button = args.get("button").and_then(Value::as_str).unwrap_or("left");
            let kind = args.get("click_type").and_then(Value::as_str).unwrap_or("click");
            format!("{count}{} {kind}{at}", title_case(button))
        }
        "left_click" | "right_click" | "middle_click" | "double_click" | "triple_click" => {
            let (button, kind) = action.split_once('_').unwrap_or((action, "click"));
            format!("{} {kind}{at}", title_case(button))
        }
        "drag_mouse" | "left_click_drag" => {
            let path = args.get("path").and_then(Value::as_array);
            let start = path.and_then(|path| point(path.first()));
            let end = path
                .and_then(|path| point(path.last()))
                .or(target);
            match (start, end) {
                (Some((x1, y1)), Some((x2, y2))) => {
                    format!("Dragging mouse from ({x1}, {y1}) to ({x2}, {y2})")
                }
                (None, Some((x, y))) => format!("Dragging mouse to ({x}, {y})"),
                _ => "Dragging mouse".to_string(),
            }
        }
        "scroll" => {
            let mut parts = Vec::new();
            if let Some(dx) = nonzero(args.get("delta_x")) {
                parts.push(format!("horizontally by {dx}"));
            }
            if let Some(dy) = nonzero(args.get("delta_y")) {
                parts.push(format!("vertically by {dy}"));
            }
            if parts.is_empty() {
                if let Some(direction) = args.get("scroll_direction").and_then(Value::as_str) {
                    parts.push(direction.to_string());
                }
            }
            format!("Scrolling {}{at}", parts.join(" and "))
        }
        "press_key" | "key" => {
            let keys = match args.get("keys").and_then(Value::as_array) {
                Some(keys) => keys
                    .iter()
                    .map(display_value)
                    .collect::<Vec<_>>()
                    .join("+"),
                None => args.get("text").map(display_value).unwrap_or_default(),
            };
            let held = args
                .get("duration")
                .map(|duration| format!(" for {}s", display_value(duration)))
                .unwrap_or_default();
            format!("Pressing {keys}{held}")
        }
        "type_text" | "type" => format!(
            "Typing: {}",
            args.get("text").map(display_value).unwrap_or_default()
        ),
        "wait" => format!(
            "Waiting for {}s",
            args.get("duration").map(display_value).unwrap_or_else(|| "?".to_string())
        ),
        "take_screenshot" | "screenshot" => "Taking screenshot".to_string(),
        "get_cursor_position" | "cursor_position" => "Getting cursor position".to_string(),
        other => {
            let rest: Map<String, Value> = args
                .iter()
                .filter(|(key, _)| key.as_str() != "action")
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            if rest.is_empty() {
                other.to_string()
            } else {
                format!("{other}: {}", describe_args(&rest))
            }
        }
    }
}

fn describe_args(args: &Map<String, Value>) -> String {
    args.iter()
        .map(|(key, value)| format!("{key}={}", display_value(value)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Strings print bare; everything else prints as JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn point(value: Option<&Value>) -> Option<(i64, i64)> {
    match value?.as_array()?.as_slice() {
        [x, y] => Some((x.as_i64()?, y.as_i64()?)),
        _ => None,
    }
}

fn nonzero(value: Option<&Value>) -> Option<String> {
    let value = value?;
    if value.as_f64() == Some(0.0) || value.is_null() {
        return None;
    }
    Some(display_value(value))
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
