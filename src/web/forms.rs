use email_address::EmailAddress;

use super::{models::SubmissionDraft, uploads::UploadOutcome};

pub const SKILL_MIN_CHARS: usize = 2;
pub const SKILL_MAX_CHARS: usize = 30;

/// Validates the text fields of the public submission form.
///
/// Every problem is reported, not just the first one.
pub fn validate_submission(form: &UploadOutcome) -> Result<SubmissionDraft, Vec<String>> {
    let mut errors = Vec::new();
    let field = |name: &str| form.first_text(name).map(str::trim).unwrap_or("");

    let full_name = field("fullName");
    if full_name.is_empty() {
        errors.push("Full name is required".to_string());
    }

    let email = field("email").to_lowercase();
    if email.is_empty() {
        errors.push("Email is required".to_string());
    } else if !is_valid_email(&email) {
        errors.push("Please enter a valid email".to_string());
    }

    let phone = field("phone");
    if phone.is_empty() {
        errors.push("Phone number is required".to_string());
    }

    let experience = match field("experience") {
        "" => {
            errors.push("Years of experience is required".to_string());
            0
        }
        raw => match raw.parse::<i32>() {
            Ok(value) if value < 0 => {
                errors.push("Experience cannot be negative".to_string());
                0
            }
            Ok(value) => value,
            Err(_) => {
                errors.push("Years of experience must be a whole number".to_string());
                0
            }
        },
    };

    let skills = match parse_skills(field("skills")) {
        Ok(skills) => skills,
        Err(mut skill_errors) => {
            errors.append(&mut skill_errors);
            Vec::new()
        }
    };

    let current_role = Some(field("currentRole"))
        .filter(|role| !role.is_empty())
        .map(str::to_string);

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(SubmissionDraft {
        full_name: full_name.to_string(),
        email,
        phone: phone.to_string(),
        experience,
        skills,
        current_role,
    })
}

/// Splits a comma separated tag list into normalized, unique skills.
pub fn parse_skills(raw: &str) -> Result<Vec<String>, Vec<String>> {
    let mut skills: Vec<String> = Vec::new();
    let mut errors = Vec::new();

    for tag in raw.split(',').map(str::trim).filter(|tag| !tag.is_empty()) {
        let tag = tag.to_lowercase();
        let length = tag.chars().count();
        if length < SKILL_MIN_CHARS {
            errors.push(format!(
                "Skill tag `{tag}` must be at least {SKILL_MIN_CHARS} characters long"
            ));
        } else if length > SKILL_MAX_CHARS {
            errors.push(format!(
                "Skill tag `{tag}` cannot exceed {SKILL_MAX_CHARS} characters"
            ));
        } else if !skills.contains(&tag) {
            skills.push(tag);
        }
    }

    if errors.is_empty() {
        Ok(skills)
    } else {
        Err(errors)
    }
}

fn is_valid_email(email: &str) -> bool {
    if !EmailAddress::is_valid(email) {
        return false;
    }
    email
        .rsplit_once('@')
        .is_some_and(|(_, domain)| domain.contains('.') && !domain.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(fields: &[(&str, &str)]) -> UploadOutcome {
        let mut outcome = UploadOutcome::default();
        for (name, value) in fields {
            outcome
                .text_fields
                .entry(name.to_string())
                .or_default()
                .push(value.to_string());
        }
        outcome
    }

    #[test]
    fn normalizes_a_valid_submission() {
        let draft = validate_submission(&form(&[
            ("fullName", "  Jane Doe "),
            ("email", " Jane.Doe@Example.COM "),
            ("phone", "+1 555 0100"),
            ("experience", "4"),
            ("skills", "Rust, SQL , rust,  ,Go"),
            ("currentRole", "  "),
        ]))
        .unwrap();

        assert_eq!(draft.full_name, "Jane Doe");
        assert_eq!(draft.email, "jane.doe@example.com");
        assert_eq!(draft.experience, 4);
        assert_eq!(draft.skills, vec!["rust", "sql", "go"]);
        assert_eq!(draft.current_role, None);
    }

    #[test]
    fn collects_every_error() {
        let errors = validate_submission(&form(&[
            ("email", "not-an-email"),
            ("experience", "-2"),
            ("skills", "x"),
        ]))
        .unwrap_err();

        assert_eq!(errors.len(), 5, "{errors:?}");
        assert!(errors.contains(&"Full name is required".to_string()));
        assert!(errors.contains(&"Please enter a valid email".to_string()));
        assert!(errors.contains(&"Phone number is required".to_string()));
        assert!(errors.contains(&"Experience cannot be negative".to_string()));
    }

    #[test]
    fn experience_must_be_an_integer() {
        let errors = validate_submission(&form(&[
            ("fullName", "Jane"),
            ("email", "jane@example.com"),
            ("phone", "1"),
            ("experience", "three"),
        ]))
        .unwrap_err();
        assert_eq!(errors, vec!["Years of experience must be a whole number"]);
    }

    #[test]
    fn skill_length_bounds() {
        assert!(parse_skills("ab").is_ok());
        assert!(parse_skills(&"a".repeat(SKILL_MAX_CHARS)).is_ok());
        assert!(parse_skills(&"a".repeat(SKILL_MAX_CHARS + 1)).is_err());
        assert_eq!(parse_skills("").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn email_requires_dotted_domain() {
        assert!(is_valid_email("a@example.org"));
        assert!(!is_valid_email("a@localhost"));
        assert!(!is_valid_email("a@@example.org"));
    }
}
