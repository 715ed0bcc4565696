// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTML pages.

use super::{DELETE_ACCOUNT_URL, SIGN_OUT_URL, UPDATE_URL, WIDGET_URL, XSRF_TOKEN_FIELD};
use crate::models::preference::{weekday_from_index, weekday_name, WEEKDAYS};
use crate::models::User;
use crate::services::mail::escape_html;

const WIDGET_SCRIPT: &str = "https://www.gstatic.com/authtoolkit/js/gitkit.js";
const WIDGET_STYLESHEET: &str = "https://www.gstatic.com/authtoolkit/css/gitkit.css";

/// Data for the home page.
pub struct HomePage<'a> {
    pub user: Option<&'a User>,
    /// Selected entry of the weekday list
    pub weekday_index: i64,
    pub update_xsrf_token: &'a str,
    pub delete_xsrf_token: &'a str,
}

/// Data for the sign-in widget page.
pub struct WidgetPage<'a> {
    pub browser_api_key: &'a str,
    pub sign_in_success_url: &'a str,
    pub oob_action_url: &'a str,
    /// URL-decoded body of the request that opened the widget
    pub post_body: &'a str,
}

pub fn render_home(page: &HomePage<'_>) -> String {
    let button_config = serde_json::json!({
        "widgetUrl": WIDGET_URL,
        "signOutUrl": SIGN_OUT_URL,
    });

    let content = match page.user {
        Some(user) => signed_in_content(user, page),
        None => "<p>Sign in to choose your favourite day of the week.</p>".to_string(),
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>FavWeekday</title>
<script type="text/javascript" src="{script}"></script>
<link type="text/css" rel="stylesheet" href="{stylesheet}">
<script type="text/javascript">
window.google.identitytoolkit.signInButton('#navbar', {button_config});
</script>
</head>
<body>
<div id="navbar"></div>
<h1>FavWeekday</h1>
{content}
</body>
</html>
"#,
        script = WIDGET_SCRIPT,
        stylesheet = WIDGET_STYLESHEET,
        button_config = script_json(&button_config),
    )
}

fn signed_in_content(user: &User, page: &HomePage<'_>) -> String {
    let display = if user.name.is_empty() {
        escape_html(&user.email)
    } else {
        format!("{} ({})", escape_html(&user.name), escape_html(&user.email))
    };
    let verified = if user.email_verified {
        ""
    } else {
        "<p><em>Your email address has not been verified yet.</em></p>\n"
    };

    let chosen = weekday_from_index(page.weekday_index);
    let options: String = WEEKDAYS
        .iter()
        .enumerate()
        .map(|(i, day)| {
            let selected = if chosen == Some(*day) {
                " selected"
            } else {
                ""
            };
            format!(
                "<option value=\"{i}\"{selected}>{}</option>\n",
                weekday_name(*day)
            )
        })
        .collect();

    format!(
        r#"<p>Welcome, {display}!</p>
{verified}<form action="{update_url}" method="post">
<label for="favorite">Your favourite weekday:</label>
<select id="favorite" name="favorite">
{options}</select>
<input type="hidden" name="{field}" value="{update_token}">
<input type="submit" value="Update">
</form>
<form action="{delete_url}" method="post" onsubmit="return confirm('Delete your account?');">
<input type="hidden" name="{field}" value="{delete_token}">
<input type="submit" value="Delete account">
</form>"#,
        update_url = UPDATE_URL,
        delete_url = DELETE_ACCOUNT_URL,
        field = XSRF_TOKEN_FIELD,
        update_token = escape_html(page.update_xsrf_token),
        delete_token = escape_html(page.delete_xsrf_token),
    )
}

pub fn render_widget(page: &WidgetPage<'_>) -> String {
    let config = serde_json::json!({
        "apiKey": page.browser_api_key,
        "signInSuccessUrl": page.sign_in_success_url,
        "oobActionUrl": page.oob_action_url,
        "siteName": "FavWeekday",
    });
    let post_body = serde_json::Value::String(page.post_body.to_string());

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>FavWeekday sign in</title>
<script type="text/javascript" src="{script}"></script>
<link type="text/css" rel="stylesheet" href="{stylesheet}">
<script type="text/javascript">
window.google.identitytoolkit.start('#gitkitWidgetDiv', {config}, {post_body});
</script>
</head>
<body>
<div id="gitkitWidgetDiv"></div>
</body>
</html>
"#,
        script = WIDGET_SCRIPT,
        stylesheet = WIDGET_STYLESHEET,
        config = script_json(&config),
        post_body = script_json(&post_body),
    )
}

/// JSON literal safe to place inside a `<script>` element.
fn script_json(value: &serde_json::Value) -> String {
    value.to_string().replace("</", "<\\/")
}
