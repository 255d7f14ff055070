use axum::{extract::State, response::Html};

use crate::{
    config::AppConfig,
    web::{AppState, escape_html, forms::SKILL_MAX_CHARS, render_footer},
};

pub async fn landing_page(State(state): State<AppState>) -> Html<String> {
    Html(render_submission_page(state.config()))
}

fn render_submission_page(config: &AppConfig) -> String {
    let footer = render_footer();
    let accept = escape_html(&config.allowed_file_types.join(","));
    let max_mb = format!("{:.1}", config.max_file_size as f64 / (1024.0 * 1024.0));
    let max_bytes = config.max_file_size;

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Submit your resume</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <style>
        :root {{ color-scheme: light; }}
        body {{ font-family: "Helvetica Neue", Arial, sans-serif; margin: 0; background: #f1f5f9; color: #0f172a; }}
        main {{ max-width: 640px; margin: 0 auto; padding: 3rem 1.5rem; box-sizing: border-box; }}
        .panel {{ background: #ffffff; padding: 2.25rem; border-radius: 18px; box-shadow: 0 20px 60px rgba(15, 23, 42, 0.08); border: 1px solid #e2e8f0; }}
        h1 {{ margin-top: 0; }}
        p.description {{ color: #475569; }}
        label {{ display: block; margin-top: 1.2rem; font-weight: 600; }}
        input {{ width: 100%; padding: 0.8rem; margin-top: 0.5rem; border-radius: 10px; border: 1px solid #cbd5f5; background: #f8fafc; font-size: 1rem; box-sizing: border-box; }}
        input:focus {{ outline: none; border-color: #2563eb; box-shadow: 0 0 0 3px rgba(37, 99, 235, 0.15); }}
        .hint {{ color: #64748b; font-size: 0.85rem; margin-top: 0.35rem; }}
        button {{ margin-top: 2rem; width: 100%; padding: 0.95rem; border: none; border-radius: 10px; background: #2563eb; color: #ffffff; font-weight: 600; font-size: 1.05rem; cursor: pointer; }}
        button:hover {{ background: #1d4ed8; }}
        button:disabled {{ opacity: 0.6; cursor: not-allowed; }}
        .status-box {{ margin-top: 1.5rem; padding: 1rem; border-radius: 12px; display: none; }}
        .status-box.error {{ display: block; background: #fee2e2; color: #b91c1c; }}
        .status-box.success {{ display: block; background: #dcfce7; color: #166534; }}
        .status-box ul {{ margin: 0.5rem 0 0; padding-left: 1.2rem; }}
        .app-footer {{ margin-top: 2.5rem; text-align: center; font-size: 0.85rem; color: #64748b; }}
    </style>
</head>
<body>
    <main>
        <section class="panel">
            <h1>Submit your resume</h1>
            <p class="description">Tell us a little about yourself and attach your resume. We review every submission.</p>
            <form id="submission-form" enctype="multipart/form-data">
                <label for="fullName">Full name</label>
                <input id="fullName" name="fullName" autocomplete="name" required>
                <label for="email">Email</label>
                <input id="email" name="email" type="email" autocomplete="email" required>
                <label for="phone">Phone</label>
                <input id="phone" name="phone" type="tel" autocomplete="tel" required>
                <label for="experience">Years of experience</label>
                <input id="experience" name="experience" type="number" min="0" step="1" required>
                <label for="skills">Skills</label>
                <input id="skills" name="skills" placeholder="rust, sql, kubernetes">
                <p class="hint">Comma separated, up to {SKILL_MAX_CHARS} characters each.</p>
                <label for="currentRole">Current role</label>
                <input id="currentRole" name="currentRole" autocomplete="organization-title">
                <label for="resume">Resume</label>
                <input id="resume" name="resume" type="file" accept="{accept}" required>
                <p class="hint">PDF or Word document, at most {max_mb} MB.</p>
                <button type="submit" id="submit-button">Submit application</button>
            </form>
            <div id="status" class="status-box" role="status"></div>
        </section>
        {footer}
    </main>
    <script>
    (function () {{
        const form = document.getElementById('submission-form');
        const statusBox = document.getElementById('status');
        const button = document.getElementById('submit-button');
        const maxBytes = {max_bytes};

        function show(kind, message, details) {{
            statusBox.className = `status-box ${{kind}}`;
            statusBox.textContent = message;
            if (details && details.length) {{
                const list = document.createElement('ul');
                details.forEach((detail) => {{
                    const item = document.createElement('li');
                    item.textContent = detail;
                    list.appendChild(item);
                }});
                statusBox.appendChild(list);
            }}
        }}

        form.addEventListener('submit', async (event) => {{
            event.preventDefault();
            const file = document.getElementById('resume').files[0];
            if (file && file.size > maxBytes) {{
                show('error', 'Your resume is larger than the allowed size.');
                return;
            }}
            button.disabled = true;
            try {{
                const response = await fetch('/api/submissions', {{ method: 'POST', body: new FormData(form) }});
                const payload = await response.json().catch(() => ({{}}));
                if (response.ok) {{
                    form.reset();
                    show('success', payload.message || 'Submission received.');
                }} else if (response.status === 409) {{
                    show('error', payload.message || 'A submission with this email already exists.');
                }} else {{
                    show('error', payload.error || 'Submission failed.', payload.details);
                }}
            }} catch (err) {{
                show('error', 'Network error, please try again.');
            }} finally {{
                button.disabled = false;
            }}
        }});
    }})();
    </script>
</body>
</html>"#,
    )
}
