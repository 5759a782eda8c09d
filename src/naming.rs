//! Derives model names, accessor names and global stub keys from backing type names.

use convert_case::{Case, Casing};

/// Name of the stub every other stub in a model inherits from.
pub const DEFAULT_STUB: &str = "default";

/// Converts a type path such as `Foo::Bar` or `BlogPost` to `foo_bar` / `blog_post`.
///
/// Returns `None` when no identifier characters remain.
pub fn underscore(type_name: &str) -> Option<String> {
    let segments: Vec<String> = type_name
        .split("::")
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.to_case(Case::Snake))
        .collect();
    let name = segments.join("_");

    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    valid.then_some(name)
}

pub fn pluralize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) && !stem.is_empty() {
            return format!("{stem}ies");
        }
    }
    if word.ends_with(['s', 'x', 'z']) || word.ends_with("ch") || word.ends_with("sh") {
        return format!("{word}es");
    }
    format!("{word}s")
}

pub fn singularize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{stem}y");
        }
    }
    for suffix in ["ches", "shes", "sses", "xes", "zes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    match word.strip_suffix('s') {
        Some(stem) if !stem.is_empty() && !stem.ends_with('s') => stem.to_string(),
        _ => word.to_string(),
    }
}

/// Default model name for a backing type: underscored and pluralized, `Foo::Bar` → `foo_bars`.
pub fn model_name(type_name: &str) -> Option<String> {
    underscore(type_name).map(|name| pluralize(&name))
}

/// Definition-wide key for a stub: `user` for the default stub, `admin_user` otherwise.
pub fn global_key(stub: &str, singular: &str) -> String {
    if stub == DEFAULT_STUB {
        singular.to_string()
    } else {
        format!("{stub}_{singular}")
    }
}
