/// Structured email content and rendering
///
/// Content is a greeting, an intro line, an optional call-to-action button
/// and an outro. The same content renders to a plain-text body and a small
/// inline-styled HTML body under the product header.

use serde::{Deserialize, Serialize};

/// Product branding shown in every email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub link: String,
}

impl Default for Product {
    fn default() -> Self {
        Self {
            name: "Task Manager".to_string(),
            link: "https://taskmanagelink.com".to_string(),
        }
    }
}

/// Call-to-action button
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailAction {
    pub instructions: String,
    pub button_text: String,
    /// CSS color for the button background
    pub button_color: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailContent {
    /// Recipient name used in the greeting
    pub name: String,
    pub intro: String,
    pub action: Option<MailAction>,
    pub outro: String,
}

const HELP_OUTRO: &str =
    "Need help, or have questions? Just reply to this email, we'd love to help.";

impl MailContent {
    /// Content for the email-verification message
    pub fn email_verification(username: &str, verification_url: &str) -> Self {
        Self {
            name: username.to_string(),
            intro: "Welcome to our app! We're excited to have you on board.".to_string(),
            action: Some(MailAction {
                instructions: "To verify your email please click on the following button:"
                    .to_string(),
                button_text: "Verify Your Email".to_string(),
                button_color: "#22BC66".to_string(),
                link: verification_url.to_string(),
            }),
            outro: HELP_OUTRO.to_string(),
        }
    }

    /// Content for the password-reset message
    pub fn password_reset(username: &str, reset_url: &str) -> Self {
        Self {
            name: username.to_string(),
            intro: "We got a request to reset the password of your account.".to_string(),
            action: Some(MailAction {
                instructions: "To reset your password, click on the following button:"
                    .to_string(),
                button_text: "Reset Password".to_string(),
                button_color: "#CE2F37".to_string(),
                link: reset_url.to_string(),
            }),
            outro: HELP_OUTRO.to_string(),
        }
    }

    /// Renders the plain-text body
    pub fn render_text(&self, product: &Product) -> String {
        let mut out = format!("Hi {},\n\n{}\n\n", self.name, self.intro);

        if let Some(action) = &self.action {
            out.push_str(&format!(
                "{}\n\n{}: {}\n\n",
                action.instructions, action.button_text, action.link
            ));
        }

        out.push_str(&format!(
            "{}\n\nYours truly,\n{}\n{}\n",
            self.outro, product.name, product.link
        ));
        out
    }

    /// Renders the HTML body
    ///
    /// All content strings are escaped.
    pub fn render_html(&self, product: &Product) -> String {
        let action = self
            .action
            .as_ref()
            .map(|action| {
                format!(
                    concat!(
                        "<p>{}</p>",
                        "<p style=\"text-align:center\">",
                        "<a href=\"{}\" style=\"background:{};color:#ffffff;",
                        "padding:10px 18px;border-radius:3px;text-decoration:none\">{}</a>",
                        "</p>"
                    ),
                    escape_html(&action.instructions),
                    escape_html(&action.link),
                    escape_html(&action.button_color),
                    escape_html(&action.button_text),
                )
            })
            .unwrap_or_default();

        format!(
            concat!(
                "<!DOCTYPE html><html><body style=\"font-family:Helvetica,Arial,sans-serif\">",
                "<h2><a href=\"{link}\">{product}</a></h2>",
                "<p>Hi {name},</p>",
                "<p>{intro}</p>",
                "{action}",
                "<p>{outro}</p>",
                "<p>Yours truly,<br>{product}</p>",
                "</body></html>"
            ),
            link = escape_html(&product.link),
            product = escape_html(&product.name),
            name = escape_html(&self.name),
            intro = escape_html(&self.intro),
            action = action,
            outro = escape_html(&self.outro),
        )
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
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
