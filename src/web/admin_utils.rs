use crate::web::escape_html;

/// Compose a flash message HTML snippet for known admin status or error codes.
pub fn compose_flash_message(status: Option<&str>, error: Option<&str>) -> String {
    if let Some(status) = status {
        let message = match status {
            "deleted" => "Submission deleted.",
            "status_updated" => "Status updated.",
            _ => "",
        };

        if !message.is_empty() {
            return format!(r#"<div class="flash success">{message}</div>"#);
        }
    }

    if let Some(error) = error {
        let message = match error {
            "not_found" => "That submission no longer exists.",
            _ => "Something went wrong. Check the server logs.",
        };

        return format!(r#"<div class="flash error">{message}</div>"#);
    }

    String::new()
}

/// Renders skill tags as chips.
pub fn skill_chips(skills: &[String]) -> String {
    if skills.is_empty() {
        return r#"<span class="muted">None listed</span>"#.to_string();
    }

    skills
        .iter()
        .map(|skill| format!(r#"<span class="chip">{}</span>"#, escape_html(skill)))
        .collect::<Vec<_>>()
        .join("")
}
