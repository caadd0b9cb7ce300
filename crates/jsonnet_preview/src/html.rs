//! HTML templates handed to the preview pane.

/// Wraps the rendered output.
pub fn document(content: &str) -> String {
    format!("<body><pre><code>{}</code></pre></body>", escape(content))
}

/// Wraps the message of a failed render.
pub fn error_document(message: &str) -> String {
    format!("<body><i><pre>{}</pre></i></body>", escape(message))
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            c => escaped.push(c),
        }
    }
    escaped
}
