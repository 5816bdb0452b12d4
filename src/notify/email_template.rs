//! Branded HTML body for reminder emails.

/// Escape text for inclusion in HTML element content or attribute values.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

const PRIMARY: &str = "#9333ea";
const SECONDARY: &str = "#2563eb";
const BACKGROUND: &str = "#f9fafb";
const CARD: &str = "#ffffff";
const TEXT_MAIN: &str = "#111827";
const TEXT_MUTED: &str = "#4b5563";
const BORDER: &str = "#e5e7eb";

/// Render a single-card email with `subject` as heading and `text` as body.
///
/// Newlines in `text` become `<br>`. The footer links to `dashboard_url`.
#[must_use]
pub fn render_email_html(subject: &str, text: &str, dashboard_url: &str) -> String {
    let subject = escape_html(subject);
    let body = escape_html(text).replace('\n', "<br>");
    let dashboard = escape_html(dashboard_url);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{subject}</title>
  <style>
    body {{ font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; line-height: 1.6; margin: 0; padding: 0; background-color: {BACKGROUND}; color: {TEXT_MAIN}; }}
    .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
    .card {{ background-color: {CARD}; border-radius: 12px; overflow: hidden; border: 1px solid {BORDER}; }}
    .header {{ background: linear-gradient(to right, {SECONDARY}, {PRIMARY}); padding: 32px 24px; text-align: center; }}
    .header h1 {{ color: white; margin: 0; font-size: 24px; font-weight: 700; }}
    .content {{ padding: 32px 24px; }}
    .text-content {{ color: {TEXT_MUTED}; font-size: 16px; }}
    .footer {{ padding: 24px; text-align: center; background-color: {BACKGROUND}; border-top: 1px solid {BORDER}; }}
    .footer p {{ margin: 0; color: {TEXT_MUTED}; font-size: 12px; }}
  </style>
</head>
<body>
  <div class="container">
    <div class="card">
      <div class="header"><h1>TaskMate</h1></div>
      <div class="content">
        <h2 style="margin-top: 0; color: {TEXT_MAIN}; font-size: 20px;">{subject}</h2>
        <div class="text-content">{body}</div>
      </div>
      <div class="footer">
        <p><a href="{dashboard}" style="color: {SECONDARY}; text-decoration: none;">Visit Dashboard</a></p>
      </div>
    </div>
  </div>
</body>
</html>
"#
    )
}
