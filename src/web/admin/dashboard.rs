use std::{borrow::Cow, collections::BTreeSet};

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use tracing::info;

use crate::web::{
    AppState,
    admin_utils::{compose_flash_message, skill_chips},
    escape_html,
    models::{DailyCount, SearchFilter, SkillCount, StatusCounts, Submission},
    responses::AppError,
    status::SubmissionStatus,
    templates::{AdminPageLayout, render_admin_page, status_options, status_tag},
};

use super::{
    auth::{issue_csrf, require_admin_page},
    types::DashboardQuery,
};

pub const RECENT_LIMIT: i64 = 50;
pub const TREND_DAYS: i64 = 7;
const TOP_SKILLS: i64 = 15;

struct DashboardData {
    counts: StatusCounts,
    today: i64,
    daily: Vec<DailyCount>,
    top_skills: Vec<SkillCount>,
    recent: Vec<Submission>,
}

pub async fn dashboard(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<DashboardQuery>,
) -> Result<Response, AppError> {
    let session = match require_admin_page(&state, &jar) {
        Ok(session) => session,
        Err(redirect) => return Ok(redirect),
    };

    let today_start = start_of_day(Utc::now());
    let trend_start = today_start - Duration::days(TREND_DAYS - 1);
    let recent_filter = SearchFilter {
        limit: RECENT_LIMIT,
        ..SearchFilter::default()
    };

    let submissions = state.submissions();
    let (counts, today, daily, top_skills, recent) = tokio::try_join!(
        submissions.count_by_status(),
        submissions.count_since(today_start),
        submissions.daily_counts(trend_start),
        submissions.skill_counts(TOP_SKILLS),
        submissions.search(&recent_filter),
    )?;

    info!(
        total = counts.total,
        today,
        recent = recent.len(),
        "dashboard data loaded"
    );

    let (jar, csrf_token) = issue_csrf(&state, &session, jar)?;
    let data = DashboardData {
        counts,
        today,
        daily,
        top_skills,
        recent,
    };

    let body_html = render_dashboard_body(&data, today_start.date_naive());
    let page = render_admin_page(AdminPageLayout {
        meta_title: "Dashboard · Resume Desk",
        page_heading: "Submissions",
        username: &session.username,
        csrf_token: Some(&csrf_token),
        back_link: None,
        flash_html: Cow::Owned(compose_flash_message(
            params.status.as_deref(),
            params.error.as_deref(),
        )),
        body_html: Cow::Owned(body_html),
        body_scripts: vec![Cow::Borrowed(DASHBOARD_SCRIPT)],
    });

    Ok((jar, Html(page)).into_response())
}

fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// One entry per day of the trend window, oldest first, zero-filled.
fn trend_window(daily: &[DailyCount], today: NaiveDate) -> Vec<DailyCount> {
    (0..TREND_DAYS)
        .rev()
        .map(|offset| {
            let day = today - Duration::days(offset);
            let count = daily
                .iter()
                .find(|entry| entry.day == day)
                .map(|entry| entry.count)
                .unwrap_or(0);
            DailyCount { day, count }
        })
        .collect()
}

fn unique_skills(submissions: &[Submission]) -> BTreeSet<String> {
    submissions
        .iter()
        .flat_map(|submission| submission.skills.iter())
        .map(|skill| skill.to_lowercase())
        .collect()
}

fn render_dashboard_body(data: &DashboardData, today: NaiveDate) -> String {
    let counts = &data.counts;

    let mut stat_cards = format!(
        r#"<div class="stat-card"><div class="value">{total}</div><div class="label">Total submissions</div></div>
<div class="stat-card"><div class="value">{today}</div><div class="label">Received today</div></div>"#,
        total = counts.total,
        today = data.today,
    );
    let mut progress = String::new();
    for status in SubmissionStatus::ALL {
        let percentage = counts.percentage(status);
        stat_cards.push_str(&format!(
            r#"<div class="stat-card"><div class="value">{count}</div><div class="label">{label} · {percentage}%</div></div>"#,
            count = counts.get(status),
            label = status.label(),
        ));
        progress.push_str(&format!(
            r#"<span class="{class}" style="width: {percentage}%" title="{label} {percentage}%"></span>"#,
            class = status.as_str(),
            label = status.label(),
        ));
    }

    let trend_rows = trend_window(&data.daily, today)
        .iter()
        .map(|entry| {
            format!(
                "<tr><td>{day}</td><td>{count}</td></tr>",
                day = entry.day.format("%a %Y-%m-%d"),
                count = entry.count
            )
        })
        .collect::<String>();

    let top_skill_rows = if data.top_skills.is_empty() {
        r#"<tr><td colspan="2" class="muted">No skills recorded yet.</td></tr>"#.to_string()
    } else {
        data.top_skills
            .iter()
            .map(|entry| {
                format!(
                    "<tr><td>{skill}</td><td>{count}</td></tr>",
                    skill = escape_html(&entry.skill),
                    count = entry.count
                )
            })
            .collect()
    };

    let skill_filters = unique_skills(&data.recent)
        .iter()
        .map(|skill| {
            format!(
                r#"<button type="button" class="secondary skill-filter" data-skill="{skill}">{skill}</button>"#,
                skill = escape_html(skill)
            )
        })
        .collect::<Vec<_>>()
        .join(" ");

    let rows = render_submission_rows(&data.recent);

    format!(
        r#"        <section class="stats">
{stat_cards}
        </section>
        <div class="progress">{progress}</div>
        <section class="panel" style="margin-top: 2rem;">
            <div class="toolbar">
                <input type="search" id="search-query" placeholder="Search name, email or skill" style="flex: 1; min-width: 220px;">
                <select id="search-status">
                    <option value="all">All statuses</option>
                    {status_options}
                </select>
                <button type="button" id="search-button">Search</button>
                <button type="button" class="secondary" id="bulk-download" disabled>Download selected</button>
                <form method="post" action="/admin/submissions/export-excel" class="inline-form" id="export-form">
                    <input type="hidden" name="_csrf" value="">
                    <button type="submit" class="secondary">Export to Excel</button>
                </form>
            </div>
            <div class="toolbar" style="margin-top: 1rem;">{skill_filters}</div>
            <table>
                <thead>
                    <tr>
                        <th><input type="checkbox" id="select-all" aria-label="Select all"></th>
                        <th>Name</th>
                        <th>Email</th>
                        <th>Skills</th>
                        <th>Status</th>
                        <th>Submitted</th>
                        <th>Resume</th>
                    </tr>
                </thead>
                <tbody id="submission-rows">
{rows}
                </tbody>
            </table>
        </section>
        <section style="display: grid; grid-template-columns: repeat(auto-fit, minmax(280px, 1fr)); gap: 1.5rem;">
            <div class="panel">
                <h2>Last {trend_days} days</h2>
                <table><thead><tr><th>Day</th><th>Submissions</th></tr></thead><tbody>{trend_rows}</tbody></table>
            </div>
            <div class="panel">
                <h2>Top skills</h2>
                <table><thead><tr><th>Skill</th><th>Candidates</th></tr></thead><tbody>{top_skill_rows}</tbody></table>
            </div>
        </section>
        <form method="post" action="/admin/submissions/bulk-download" id="bulk-form" style="display: none;">
            <input type="hidden" name="ids" value="">
            <input type="hidden" name="_csrf" value="">
        </form>"#,
        status_options = status_options(None),
        trend_days = TREND_DAYS,
    )
}

pub fn render_submission_rows(submissions: &[Submission]) -> String {
    if submissions.is_empty() {
        return r#"<tr><td colspan="7" class="muted">No submissions yet.</td></tr>"#.to_string();
    }

    submissions
        .iter()
        .map(|submission| {
            format!(
                r#"<tr data-id="{id}">
    <td><input type="checkbox" class="row-select" value="{id}"></td>
    <td><a href="/admin/submissions/{id}">{name}</a></td>
    <td>{email}</td>
    <td>{skills}</td>
    <td>{status}</td>
    <td>{submitted}</td>
    <td><a href="/admin/submissions/{id}/view" target="_blank" rel="noopener">View</a> · <a href="/admin/submissions/{id}/download">Download</a></td>
</tr>"#,
                id = submission.id,
                name = escape_html(&submission.full_name),
                email = escape_html(&submission.email),
                skills = skill_chips(&submission.skills),
                status = status_tag(submission.status),
                submitted = submission.created_at.format("%Y-%m-%d %H:%M"),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

const DASHBOARD_SCRIPT: &str = r#"<script>
(function () {
    const csrf = document.querySelector('meta[name="csrf-token"]')?.content || '';
    const rows = document.getElementById('submission-rows');
    const bulkButton = document.getElementById('bulk-download');
    const selectAll = document.getElementById('select-all');

    document.querySelectorAll('input[name="_csrf"]').forEach((input) => { input.value = csrf; });

    const escapeHtml = (value) => String(value)
        .replace(/&/g, '&amp;').replace(/</g, '&lt;').replace(/>/g, '&gt;')
        .replace(/"/g, '&quot;').replace(/'/g, '&#39;');
    const label = (status) => status.charAt(0).toUpperCase() + status.slice(1);

    function selectedIds() {
        return Array.from(document.querySelectorAll('.row-select:checked')).map((box) => box.value);
    }

    function refreshBulkState() {
        bulkButton.disabled = selectedIds().length === 0;
    }

    function renderRows(submissions) {
        if (!submissions.length) {
            rows.innerHTML = '<tr><td colspan="7" class="muted">No matching submissions.</td></tr>';
            return;
        }
        rows.innerHTML = submissions.map((s) => {
            const skills = (s.skills || []).map((skill) => `<span class="chip">${escapeHtml(skill)}</span>`).join('');
            const submitted = new Date(s.createdAt).toLocaleString();
            return `<tr data-id="${s.id}">
    <td><input type="checkbox" class="row-select" value="${s.id}"></td>
    <td><a href="/admin/submissions/${s.id}">${escapeHtml(s.fullName)}</a></td>
    <td>${escapeHtml(s.email)}</td>
    <td>${skills || '<span class="muted">None listed</span>'}</td>
    <td><span class="status-tag ${s.status}">${label(s.status)}</span></td>
    <td>${escapeHtml(submitted)}</td>
    <td><a href="/admin/submissions/${s.id}/view" target="_blank" rel="noopener">View</a> · <a href="/admin/submissions/${s.id}/download">Download</a></td>
</tr>`;
        }).join('\n');
        selectAll.checked = false;
        refreshBulkState();
    }

    async function search(queryOverride) {
        const params = new URLSearchParams();
        const query = queryOverride ?? document.getElementById('search-query').value.trim();
        if (query) params.set('query', query);
        params.set('status', document.getElementById('search-status').value);
        const response = await fetch(`/admin/search?${params}`, { credentials: 'same-origin' });
        if (response.status === 401) { window.location = '/admin/login'; return; }
        if (!response.ok) { alert('Search failed'); return; }
        renderRows(await response.json());
    }

    document.getElementById('search-button').addEventListener('click', () => search());
    document.getElementById('search-query').addEventListener('keydown', (event) => {
        if (event.key === 'Enter') search();
    });
    document.getElementById('search-status').addEventListener('change', () => search());
    document.querySelectorAll('.skill-filter').forEach((button) => {
        button.addEventListener('click', () => {
            document.getElementById('search-query').value = button.dataset.skill;
            search(button.dataset.skill);
        });
    });

    rows.addEventListener('change', (event) => {
        if (event.target.classList.contains('row-select')) refreshBulkState();
    });
    selectAll.addEventListener('change', () => {
        document.querySelectorAll('.row-select').forEach((box) => { box.checked = selectAll.checked; });
        refreshBulkState();
    });

    bulkButton.addEventListener('click', () => {
        const form = document.getElementById('bulk-form');
        form.elements.ids.value = JSON.stringify(selectedIds());
        form.submit();
    });
})();
</script>"#;
