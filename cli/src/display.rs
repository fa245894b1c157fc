//! Transcript formatting for stdout: one banner per message, then the snapshot.

use threadline::{Message, StateSnapshot};

const BANNER_WIDTH: usize = 80;
const INDENT: &str = "  ";

/// `==== Human Message ====` centered in 80 columns.
pub(crate) fn banner(title: &str) -> String {
    let title = format!(" {} ", title);
    let side = BANNER_WIDTH.saturating_sub(title.len()) / 2;
    let right = if title.len() % 2 == 1 { side + 1 } else { side };
    format!("{}{}{}", "=".repeat(side), title, "=".repeat(right))
}

fn title(message: &Message) -> &'static str {
    match message {
        Message::System { .. } => "System Message",
        Message::Human { .. } => "Human Message",
        Message::Ai { .. } => "Ai Message",
        Message::Tool { .. } => "Tool Message",
    }
}

/// Truncates a string to at most `max` chars; appends "..." when truncated. UTF-8 safe.
pub(crate) fn truncate_display(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let keep = max.saturating_sub(3);
    format!("{}...", s.chars().take(keep).collect::<String>())
}

/// Banner plus body for one appended message.
pub(crate) fn format_message(message: &Message) -> String {
    let mut lines = vec![banner(title(message))];
    if let Message::Tool { name, is_error, .. } = message {
        lines.push(if *is_error {
            format!("Name: {} (error)", name)
        } else {
            format!("Name: {}", name)
        });
    }
    lines.push(String::new());
    if !message.content().is_empty() {
        lines.push(message.content().to_string());
    }
    if !message.tool_calls().is_empty() {
        lines.push("Tool Calls:".to_string());
        for call in message.tool_calls() {
            lines.push(format!("{}{}", INDENT, call.name));
            lines.push(format!("{} Call ID: {}", INDENT, call.id));
            lines.push(format!("{}  Args: {}", INDENT, call.arguments));
        }
    }
    lines.join("\n")
}

/// Human-readable snapshot: messages (truncated), next, config, metadata.
pub(crate) fn format_snapshot(snapshot: &StateSnapshot, max: usize) -> String {
    let mut lines = vec!["StateSnapshot {".to_string()];
    lines.push(format!("{}values:", INDENT));
    for m in &snapshot.values.messages {
        lines.push(format!(
            "{}{}{}({:?}) id={}",
            INDENT,
            INDENT,
            m.role(),
            truncate_display(m.content(), max),
            m.id()
        ));
        for call in m.tool_calls() {
            lines.push(format!(
                "{}{}{}-> {}({}) call_id={}",
                INDENT,
                INDENT,
                INDENT,
                call.name,
                truncate_display(&call.arguments, max),
                call.id
            ));
        }
    }
    lines.push(format!("{}next: {:?}", INDENT, snapshot.next));
    lines.push(format!(
        "{}config: thread_id={} checkpoint_id={}",
        INDENT,
        snapshot.config.thread_id.as_deref().unwrap_or(""),
        snapshot.checkpoint_id().unwrap_or("-")
    ));
    match &snapshot.metadata {
        Some(meta) => lines.push(format!(
            "{}metadata: source={} step={}",
            INDENT,
            meta.source.as_str(),
            meta.step
        )),
        None => lines.push(format!("{}metadata: none", INDENT)),
    }
    if let Some(created_at) = snapshot.created_at {
        lines.push(format!("{}created_at: {}", INDENT, created_at.to_rfc3339()));
    }
    lines.push(format!(
        "{}parent_config: {}",
        INDENT,
        snapshot
            .parent_config
            .as_ref()
            .and_then(|c| c.checkpoint_id.as_deref())
            .unwrap_or("-")
    ));
    lines.push("}".to_string());
    lines.join("\n")
}
