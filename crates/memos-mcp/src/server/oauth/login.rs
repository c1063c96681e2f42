//! HTML pages for the authorization endpoint.

/// Parameters carried through the login form unmodified.
#[derive(Debug, Clone, Default)]
pub struct LoginForm<'a> {
    pub client_name: &'a str,
    pub client_id: &'a str,
    pub redirect_uri: &'a str,
    pub state: &'a str,
    pub code_challenge: &'a str,
    pub code_challenge_method: &'a str,
    pub scope: &'a str,
}

const STYLE: &str = r#"<style>
body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; background: #f5f5f5; margin: 0; display: flex; justify-content: center; align-items: center; min-height: 100vh; }
.card { background: #fff; border-radius: 8px; box-shadow: 0 2px 8px rgba(0,0,0,0.1); padding: 32px; max-width: 400px; width: 100%; }
h1 { font-size: 20px; margin: 0 0 8px; color: #333; }
.subtitle { color: #666; font-size: 14px; margin: 0 0 24px; }
.error { background: #fee; border: 1px solid #c00; color: #c00; padding: 10px; border-radius: 4px; margin-bottom: 16px; }
label { display: block; font-size: 14px; font-weight: 500; margin-bottom: 6px; color: #333; }
input[type="password"] { width: 100%; padding: 10px; border: 1px solid #ddd; border-radius: 4px; font-size: 14px; box-sizing: border-box; }
button { width: 100%; padding: 10px; background: #4a90d9; color: #fff; border: none; border-radius: 4px; font-size: 14px; font-weight: 500; cursor: pointer; margin-top: 16px; }
button:hover { background: #357abd; }
</style>"#;

/// Render the password challenge.
///
/// All parameters are HTML-escaped.
#[must_use]
pub fn render_login_page(form: &LoginForm<'_>, error_message: Option<&str>) -> String {
    let error_html = error_message
        .map(|msg| format!(r#"<div class="error">{}</div>"#, html_escape(msg)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width,initial-scale=1">
<title>Authorize - Memos MCP</title>
{STYLE}
</head>
<body>
<div class="card">
<h1>Memos MCP</h1>
<p class="subtitle"><strong>{client_name}</strong> is requesting access</p>
{error_html}
<form method="POST" action="/authorize">
<input type="hidden" name="client_id" value="{client_id}">
<input type="hidden" name="redirect_uri" value="{redirect_uri}">
<input type="hidden" name="state" value="{state}">
<input type="hidden" name="code_challenge" value="{code_challenge}">
<input type="hidden" name="code_challenge_method" value="{code_challenge_method}">
<input type="hidden" name="scope" value="{scope}">
<label for="password">Server Password</label>
<input type="password" id="password" name="password" placeholder="Enter MCP server password" required autofocus>
<button type="submit">Approve</button>
</form>
</div>
</body>
</html>"#,
        client_name = html_escape(form.client_name),
        client_id = html_escape(form.client_id),
        redirect_uri = html_escape(form.redirect_uri),
        state = html_escape(form.state),
        code_challenge = html_escape(form.code_challenge),
        code_challenge_method = html_escape(form.code_challenge_method),
        scope = html_escape(form.scope),
    )
}

/// Render a terminal error page (no form, no redirect).
#[must_use]
pub fn render_error_page(error: &str, description: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Authorization Error - Memos MCP</title>
{STYLE}
</head>
<body>
<div class="card">
<h1>Authorization failed</h1>
<div class="error"><strong>{error}</strong>: {description}</div>
</div>
</body>
</html>"#,
        error = html_escape(error),
        description = html_escape(description),
    )
}

/// Escape HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
