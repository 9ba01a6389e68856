//! Template and color validation utilities.

use minijinja::{Environment, UndefinedBehavior};
use regex::Regex;
use std::sync::LazyLock;

/// Validates Jinja template syntax.
pub(crate) fn validate_jinja_template(source: &str) -> Result<(), String> {
    let mut env = Environment::new();
    env.add_template("_validate", source)
        .map_err(|e| e.to_string())?;
    Ok(())
}

/// Validates a Jinja template by performing a test render with empty data.
/// Detects runtime errors like unknown filters.
///
/// # Errors
/// Returns an error string if the template syntax is invalid or uses unknown filters.
pub fn validate_template_render(source: &str) -> Result<(), String> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Lenient);
    env.add_template("_render_test", source)
        .map_err(|e| e.to_string())?;

    let tmpl = env
        .get_template("_render_test")
        .map_err(|e| e.to_string())?;
    tmpl.render(serde_json::json!({}))
        .map_err(|e| e.to_string())?;

    Ok(())
}

/// Checks a card theme colour and returns it without the leading `#`.
///
/// Accepts `rrggbb` or `#rrggbb`.
pub(crate) fn normalize_theme_color(color: &str) -> Result<String, String> {
    static THEME_COLOR_REGEX: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^#?[0-9a-fA-F]{6}$").expect("valid regex"));

    if THEME_COLOR_REGEX.is_match(color) {
        Ok(color.trim_start_matches('#').to_string())
    } else {
        Err(format!(
            "invalid hex color '{}': must be in format rrggbb or #rrggbb (e.g., 0076D7)",
            color
        ))
    }
}
