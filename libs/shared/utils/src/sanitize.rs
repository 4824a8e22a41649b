use std::sync::OnceLock;

use regex::Regex;

pub const MAX_TEXT_LENGTH: usize = 500;

struct Patterns {
    angle_brackets: Regex,
    script_scheme: Regex,
    event_handler: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        angle_brackets: Regex::new(r"[<>]").expect("static pattern"),
        script_scheme: Regex::new(r"(?i)javascript\s*:").expect("static pattern"),
        event_handler: Regex::new(r"(?i)\bon[a-z]+\s*=").expect("static pattern"),
    })
}

/// Cleans free text typed into a form before it is sent anywhere: strips
/// angle brackets, `javascript:` schemes and inline `on*=` handlers, then trims
/// and truncates to [`MAX_TEXT_LENGTH`] characters.
pub fn sanitize_text(input: &str) -> String {
    let patterns = patterns();
    let mut current = input.to_string();

    // Removal can splice a new match together ("javajavascript:script:").
    loop {
        let next = patterns.angle_brackets.replace_all(&current, "");
        let next = patterns.script_scheme.replace_all(&next, "");
        let next = patterns.event_handler.replace_all(&next, "").into_owned();

        if next == current {
            break;
        }
        current = next;
    }

    current.trim().chars().take(MAX_TEXT_LENGTH).collect()
}

/// `None` when nothing is left after sanitizing.
pub fn sanitize_optional(input: &str) -> Option<String> {
    let cleaned = sanitize_text(input);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}
