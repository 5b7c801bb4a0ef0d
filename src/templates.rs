use std::collections::HashMap;

/// Simple mustache-style template rendering: replaces `{{KEY}}` with values.
///
/// The template is scanned once, so substituted values are never
/// themselves searched for placeholders. Unknown keys are left in place.
pub fn render(template: &str, vars: &HashMap<&str, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}").and_then(|end| vars.get(&after[..end]).map(|v| (end, v))) {
            Some((end, val)) => {
                out.push_str(val);
                rest = &after[end + 2..];
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Mask a secret value showing only the last 4 characters.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

// --- Embedded templates ---
pub const SERVICE_UNIT: &str = include_str!("templates/jupyter-lab.service");
