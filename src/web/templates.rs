use std::borrow::Cow;

use chrono::{Datelike, Utc};

use crate::web::status::SubmissionStatus;

const ADMIN_PAGE_BASE_STYLES: &str = r#"
        :root { color-scheme: light; }
        body { font-family: "Helvetica Neue", Arial, sans-serif; margin: 0; background: #f8fafc; color: #0f172a; }
        header { background: #ffffff; padding: 1.5rem; border-bottom: 1px solid #e2e8f0; }
        .header-bar { display: flex; justify-content: space-between; align-items: center; flex-wrap: wrap; gap: 1rem; }
        .header-bar h1 { margin: 0; font-size: 1.5rem; }
        .header-actions { display: flex; gap: 0.75rem; align-items: center; flex-wrap: wrap; }
        .back-link { display: inline-flex; align-items: center; gap: 0.4rem; color: #1d4ed8; text-decoration: none; font-weight: 600; background: #e0f2fe; padding: 0.5rem 0.95rem; border-radius: 999px; border: 1px solid #bfdbfe; }
        .back-link:hover { background: #bfdbfe; border-color: #93c5fd; }
        .user-tag { color: #475569; font-size: 0.95rem; }
        main { padding: 2rem 1.5rem; max-width: 1200px; margin: 0 auto; box-sizing: border-box; }
        section { margin-bottom: 2.5rem; }
        .panel { background: #ffffff; border-radius: 12px; border: 1px solid #e2e8f0; padding: 1.5rem; box-shadow: 0 18px 40px rgba(15, 23, 42, 0.08); }
        .panel h2 { margin-top: 0; }
        label { display: block; margin-bottom: 0.5rem; font-weight: 600; color: #0f172a; }
        input[type="text"], input[type="search"], select { padding: 0.65rem; border-radius: 8px; border: 1px solid #cbd5f5; background: #f8fafc; color: #0f172a; box-sizing: border-box; }
        select:focus, input:focus { outline: none; border-color: #2563eb; box-shadow: 0 0 0 3px rgba(37, 99, 235, 0.12); }
        button, .button { display: inline-block; padding: 0.6rem 1rem; border: none; border-radius: 8px; background: #2563eb; color: #ffffff; font-weight: 600; cursor: pointer; text-decoration: none; font-size: 0.92rem; }
        button:hover, .button:hover { background: #1d4ed8; }
        button:disabled { opacity: 0.6; cursor: not-allowed; }
        button.secondary, .button.secondary { background: #e2e8f0; color: #0f172a; }
        button.secondary:hover, .button.secondary:hover { background: #cbd5e1; }
        button.danger { background: #dc2626; }
        button.danger:hover { background: #b91c1c; }
        table { width: 100%; border-collapse: collapse; margin-top: 1rem; background: #ffffff; border: 1px solid #e2e8f0; border-radius: 12px; overflow: hidden; }
        th, td { padding: 0.7rem 0.9rem; border-bottom: 1px solid #e2e8f0; text-align: left; font-size: 0.92rem; vertical-align: top; }
        th { background: #f1f5f9; font-weight: 600; }
        td a { color: #1d4ed8; text-decoration: none; font-weight: 600; }
        td a:hover { text-decoration: underline; }
        .stats { display: grid; grid-template-columns: repeat(auto-fit, minmax(160px, 1fr)); gap: 1rem; }
        .stat-card { background: #ffffff; border: 1px solid #e2e8f0; border-radius: 12px; padding: 1rem 1.25rem; }
        .stat-card .value { font-size: 1.8rem; font-weight: 700; }
        .stat-card .label { color: #475569; font-size: 0.9rem; }
        .progress { display: flex; height: 0.65rem; border-radius: 999px; overflow: hidden; background: #e2e8f0; margin-top: 1rem; }
        .progress span { display: block; height: 100%; }
        .progress .pending { background: #f59e0b; }
        .progress .reviewed { background: #3b82f6; }
        .progress .shortlisted { background: #22c55e; }
        .progress .rejected { background: #ef4444; }
        .status-tag { display: inline-flex; align-items: center; padding: 0.2rem 0.7rem; border-radius: 999px; font-size: 0.82rem; font-weight: 600; }
        .status-tag.pending { background: #fef3c7; color: #92400e; }
        .status-tag.reviewed { background: #e0f2fe; color: #1d4ed8; }
        .status-tag.shortlisted { background: #dcfce7; color: #166534; }
        .status-tag.rejected { background: #fee2e2; color: #b91c1c; }
        .chip { display: inline-block; background: #eef2ff; color: #3730a3; border-radius: 999px; padding: 0.15rem 0.6rem; margin: 0 0.3rem 0.3rem 0; font-size: 0.8rem; }
        .muted { color: #94a3b8; }
        .toolbar { display: flex; gap: 0.75rem; align-items: center; flex-wrap: wrap; }
        .flash { padding: 0.85rem 1rem; border-radius: 10px; margin-bottom: 1.5rem; font-weight: 600; }
        .flash.success { background: #dcfce7; color: #166534; }
        .flash.error { background: #fee2e2; color: #b91c1c; }
        .detail-grid { display: grid; grid-template-columns: 180px 1fr; gap: 0.6rem 1rem; }
        .detail-grid dt { font-weight: 600; color: #475569; }
        .detail-grid dd { margin: 0; }
        .inline-form { display: inline; }
        .app-footer { margin-top: 3rem; text-align: center; font-size: 0.85rem; color: #94a3b8; }
        @media (max-width: 768px) {
            header { padding: 1.25rem 1rem; }
            main { padding: 1.5rem 1rem; }
            .header-bar { flex-direction: column; align-items: flex-start; }
            th, td { padding: 0.5rem; }
            .detail-grid { grid-template-columns: 1fr; }
        }
"#;

pub struct AdminPageLayout<'a> {
    pub meta_title: &'a str,
    pub page_heading: &'a str,
    pub username: &'a str,
    /// Anti-forgery token exposed to page scripts via `<meta name="csrf-token">`.
    pub csrf_token: Option<&'a str>,
    pub back_link: Option<(&'a str, &'a str)>,
    pub flash_html: Cow<'a, str>,
    pub body_html: Cow<'a, str>,
    pub body_scripts: Vec<Cow<'a, str>>,
}

pub fn render_admin_page(layout: AdminPageLayout<'_>) -> String {
    let AdminPageLayout {
        meta_title,
        page_heading,
        username,
        csrf_token,
        back_link,
        flash_html,
        body_html,
        body_scripts,
    } = layout;

    let csrf_meta = csrf_token
        .map(|token| {
            format!(
                r#"<meta name="csrf-token" content="{}">"#,
                escape_html(token)
            )
        })
        .unwrap_or_default();

    let back_link_html = back_link
        .map(|(href, label)| {
            format!(
                r#"<a class="back-link" href="{href}">← {label}</a>"#,
                href = escape_html(href),
                label = escape_html(label),
            )
        })
        .unwrap_or_default();

    let scripts = body_scripts
        .into_iter()
        .map(|script| script.into_owned())
        .collect::<Vec<_>>()
        .join("\n");

    let footer = render_footer();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{meta_title}</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="robots" content="noindex,nofollow">
    {csrf_meta}
    <style>
{styles}
    </style>
</head>
<body>
    <header>
        <div class="header-bar">
            <h1>{page_heading}</h1>
            <div class="header-actions">
                {back_link_html}
                <span class="user-tag">Signed in as {username}</span>
                <form method="post" action="/admin/logout" class="inline-form">
                    <button type="submit" class="secondary">Log out</button>
                </form>
            </div>
        </div>
    </header>
    <main>
        {flash_html}
{body_html}
        {footer}
    </main>
{scripts}
</body>
</html>"#,
        meta_title = escape_html(meta_title),
        page_heading = escape_html(page_heading),
        username = escape_html(username),
        styles = ADMIN_PAGE_BASE_STYLES,
    )
}

pub fn render_login_page(error: Option<&str>) -> String {
    let footer = render_footer();
    let error_html = error
        .map(|message| format!(r#"<div class="flash error">{}</div>"#, escape_html(message)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Admin Login · Resume Desk</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="robots" content="noindex,nofollow">
    <style>
        :root {{ color-scheme: light; }}
        body {{ font-family: "Helvetica Neue", Arial, sans-serif; display: flex; flex-direction: column; align-items: center; justify-content: center; min-height: 100vh; margin: 0; background: #f1f5f9; color: #0f172a; padding: 1.5rem; box-sizing: border-box; gap: 1.5rem; }}
        main {{ width: 100%; max-width: 440px; display: flex; flex-direction: column; align-items: center; gap: 1.5rem; }}
        .panel {{ background: #ffffff; padding: 2.5rem 2.25rem; border-radius: 18px; box-shadow: 0 20px 60px rgba(15, 23, 42, 0.08); width: 100%; border: 1px solid #e2e8f0; box-sizing: border-box; }}
        h1 {{ margin: 0 0 1rem; font-size: 1.7rem; text-align: center; }}
        p.description {{ margin: 0 0 1.5rem; color: #475569; text-align: center; font-size: 0.95rem; }}
        label {{ display: block; margin-top: 1.2rem; font-weight: 600; color: #0f172a; }}
        input {{ width: 100%; padding: 0.85rem; margin-top: 0.65rem; border-radius: 10px; border: 1px solid #cbd5f5; background: #f8fafc; color: #0f172a; font-size: 1rem; box-sizing: border-box; }}
        input:focus {{ outline: none; border-color: #2563eb; box-shadow: 0 0 0 3px rgba(37, 99, 235, 0.15); }}
        button {{ margin-top: 2rem; width: 100%; padding: 0.95rem; border: none; border-radius: 10px; background: #2563eb; color: #ffffff; font-weight: 600; font-size: 1.05rem; cursor: pointer; }}
        button:hover {{ background: #1d4ed8; }}
        .flash.error {{ padding: 0.85rem 1rem; border-radius: 10px; background: #fee2e2; color: #b91c1c; font-weight: 600; }}
        .app-footer {{ margin-top: 2.5rem; text-align: center; font-size: 0.85rem; color: #64748b; }}
    </style>
</head>
<body>
    <main>
        <section class="panel">
            <h1>Resume Desk Admin</h1>
            <p class="description">Sign in to review submitted resumes.</p>
            {error_html}
            <form method="post" action="/admin/login">
                <label for="username">Username</label>
                <input id="username" name="username" autocomplete="username" required>
                <label for="password">Password</label>
                <input id="password" type="password" name="password" autocomplete="current-password" required>
                <button type="submit">Sign in</button>
            </form>
        </section>
        {footer}
    </main>
</body>
</html>"#,
    )
}

pub fn render_footer() -> String {
    let current_year = Utc::now().year();
    format!(
        r#"<footer class="app-footer">© {year} Resume Desk</footer>"#,
        year = current_year
    )
}

pub fn status_tag(status: SubmissionStatus) -> String {
    format!(
        r#"<span class="status-tag {class}">{label}</span>"#,
        class = status.as_str(),
        label = status.label()
    )
}

/// `<option>` list over every status, with `selected` marking the current one.
pub fn status_options(selected: Option<SubmissionStatus>) -> String {
    SubmissionStatus::ALL
        .iter()
        .map(|status| {
            format!(
                r#"<option value="{value}"{selected}>{label}</option>"#,
                value = status.as_str(),
                label = status.label(),
                selected = if Some(*status) == selected {
                    " selected"
                } else {
                    ""
                },
            )
        })
        .collect::<Vec<_>>()
        .join("")
}

pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
