//! HTML5 rendering of the message table.

use std::fmt::Write;

use crate::archive::MessageRecord;

const STYLE: &str = "\
body { font-family: Arial, sans-serif; margin: 20px; }
table { border-collapse: collapse; width: 100%; }
th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }
th { background-color: #f2f2f2; }
tr:nth-child(even) { background-color: #f9f9f9; }
img { max-width: 200px; }";

const COLUMNS: [&str; 5] = ["id", "date", "message", "sender_id", "reply_to"];

/// Escapes `&`, `<`, `>`, `"` and `'` for HTML text and attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn optional(v: Option<i64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

/// Full HTML document for `records` of chat `chat_name`.
pub fn render_report(chat_name: &str, records: &[MessageRecord]) -> String {
    let title = escape_html(chat_name);
    let mut html = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(html, "<!DOCTYPE html>");
    let _ = writeln!(html, "<html>\n<head>\n<meta charset=\"UTF-8\">");
    let _ = writeln!(html, "<title>Chat Export: {}</title>", title);
    let _ = writeln!(html, "<style>\n{}\n</style>\n</head>\n<body>", STYLE);
    let _ = writeln!(html, "<h1>Exported Messages: {}</h1>", title);
    let _ = writeln!(html, "<p>Total Messages: {}</p>", records.len());
    let _ = writeln!(html, "<table>\n<thead>\n<tr>");
    for col in COLUMNS {
        let _ = writeln!(html, "<th>{}</th>", col);
    }
    let _ = writeln!(html, "</tr>\n</thead>\n<tbody>");
    for r in records {
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            r.id,
            r.date.format("%Y-%m-%d %H:%M:%S%:z"),
            escape_html(&r.text),
            optional(r.sender_id),
            optional(r.reply_to),
        );
    }
    let _ = writeln!(html, "</tbody>\n</table>\n</body>\n</html>");
    html
}
