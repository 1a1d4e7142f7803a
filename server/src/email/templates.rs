//! Email templates and `{{field}}` rendering.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

/// A subject/body pair with `{{field}}` placeholders. Bodies are HTML.
#[derive(Debug, Clone, Copy)]
pub struct EmailTemplate {
    pub key: &'static str,
    pub subject: &'static str,
    pub body: &'static str,
}

/// All registered templates.
pub const TEMPLATES: &[EmailTemplate] = &[
    EmailTemplate {
        key: "user-verification",
        subject: "New User Verification Required",
        body: r#"
<h1>New User Verification Required</h1>
<p>Hello {{approverName}},</p>
<p>A new user has registered for the 10 Ocean Tenant Association and requires verification:</p>
<ul>
  <li><strong>Name:</strong> {{userName}}</li>
  <li><strong>Email:</strong> {{userEmail}}</li>
</ul>
<p>Please review this user's information and verify their account.</p>
<p><a href="{{verificationLink}}" target="_blank">Click here to review this user</a></p>
<p>Thank you for your help maintaining our community!</p>
<p>- 10 Ocean Tenant Association</p>
"#,
    },
    EmailTemplate {
        key: "user-verification-approved",
        subject: "Your Account Has Been Verified",
        body: r#"
<h1>Account Verification Approved</h1>
<p>Hello {{userName}},</p>
<p>Great news! Your 10 Ocean Tenant Association account has been verified and approved.</p>
<p>You now have full access to resident features, including the resident directory and building announcements.</p>
<p><a href="{{loginLink}}" target="_blank">Click here to log in to your account</a></p>
<p>Welcome to our community!</p>
<p>- 10 Ocean Tenant Association</p>
"#,
    },
    EmailTemplate {
        key: "user-verification-rejected",
        subject: "Account Verification Status",
        body: r"
<h1>Account Verification Update</h1>
<p>Hello {{userName}},</p>
<p>We've reviewed your application for the 10 Ocean Tenant Association, and unfortunately, we were unable to verify your account at this time.</p>
<p><strong>Reason:</strong> {{reason}}</p>
<p>If you believe this is an error or would like more information, please contact our management team at {{contactEmail}}.</p>
<p>- 10 Ocean Tenant Association</p>
",
    },
    EmailTemplate {
        key: "floor-message",
        subject: "Floor {{floorNumber}}: {{subject}}",
        body: r"
<h1>{{subject}}</h1>
<p>Hello {{recipientName}},</p>
<p>{{message}}</p>
<p>- {{captainName}}, Floor {{floorNumber}} Captain</p>
",
    },
];

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").unwrap_or_else(|_| unreachable!())
});

/// Look up a template by key.
#[must_use]
pub fn find_template(key: &str) -> Option<&'static EmailTemplate> {
    TEMPLATES.iter().find(|t| t.key == key)
}

/// HTML-escape a value before substitution.
fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '`' => out.push_str("&#x60;"),
            '=' => out.push_str("&#x3D;"),
            _ => out.push(c),
        }
    }
    out
}

/// Scalar values render as text; missing, null and structured values render empty.
fn display_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Substitute `{{field}}` placeholders from `data`, HTML-escaping each value.
#[must_use]
pub fn render(source: &str, data: &Map<String, Value>) -> String {
    PLACEHOLDER
        .replace_all(source, |caps: &Captures<'_>| {
            escape_html(&display_value(data.get(&caps[1])))
        })
        .into_owned()
}

/// Substitute `{{field}}` placeholders without escaping, for plain-text headers.
#[must_use]
pub fn render_plain(source: &str, data: &Map<String, Value>) -> String {
    PLACEHOLDER
        .replace_all(source, |caps: &Captures<'_>| display_value(data.get(&caps[1])))
        .into_owned()
}
