//! Text rendering utilities for diagnostics.
//!
//! Formats provider chains, target type names and suggestions
//! that show up in container error messages.

/// Renders a provider chain as a readable string.
///
/// # Examples
/// ```
/// use wirebox_support::rendering::render_chain;
///
/// let chain = vec!["users_manager", "photos_manager", "database", "users_manager"];
/// let rendered = render_chain(&chain);
/// assert_eq!(rendered, "users_manager → photos_manager → database → users_manager");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    chain
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(" → ")
}

/// Shortens a fully qualified type name for display.
///
/// ```
/// use wirebox_support::rendering::shorten_type_name;
///
/// let short = shorten_type_name("photostorage::gateways::PostgreSQL");
/// assert_eq!(short, "PostgreSQL");
///
/// let short = shorten_type_name("alloc::sync::Arc<dyn app::mappers::Mapper>");
/// assert_eq!(short, "Arc<dyn Mapper>");
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut result = String::with_capacity(full_name.len());
    let mut chars = full_name.chars().peekable();
    let mut current_segment = String::new();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                current_segment.clear();
            }
            '<' | '>' | ',' | ' ' | '(' | ')' | '&' => {
                result.push_str(&current_segment);
                result.push(ch);
                current_segment.clear();
            }
            _ => current_segment.push(ch),
        }
    }

    result.push_str(&current_segment);
    result
}

/// Suggests declared names that are close to `requested`.
///
/// Matches are ranked: substring containment first, then a shared
/// prefix, then names that agree position by position on most
/// characters (catches typos like `databse`).
///
/// ```
/// use wirebox_support::rendering::suggest_similar;
///
/// let declared = ["database", "redis", "photo_mapper"];
/// assert_eq!(suggest_similar("databse", &declared, 3), vec!["database"]);
/// ```
pub fn suggest_similar(requested: &str, available: &[&str], max_suggestions: usize) -> Vec<String> {
    let requested_lower = requested.to_lowercase();

    let mut scored: Vec<(&str, usize)> = available
        .iter()
        .filter_map(|&name| {
            let name_lower = name.to_lowercase();
            if name_lower == requested_lower {
                return None;
            }

            if name_lower.contains(&requested_lower) || requested_lower.contains(&name_lower) {
                return Some((name, 100));
            }

            let common_prefix = name_lower
                .chars()
                .zip(requested_lower.chars())
                .take_while(|(a, b)| a == b)
                .count();
            if common_prefix >= 3 {
                return Some((name, 50 + common_prefix));
            }

            if is_close(&requested_lower, &name_lower) {
                return Some((name, 40));
            }

            None
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Cheap closeness check: lengths within 3 and at least 60% of
/// positions agree.
fn is_close(a: &str, b: &str) -> bool {
    let (a_len, b_len) = (a.chars().count(), b.chars().count());
    if a_len.abs_diff(b_len) > 3 {
        return false;
    }

    let max_len = a_len.max(b_len);
    if max_len == 0 {
        return true;
    }

    let common = a.chars().zip(b.chars()).filter(|(ca, cb)| ca == cb).count();
    common * 100 / max_len >= 60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_simple_chain() {
        let chain = vec!["a", "b", "c", "a"];
        assert_eq!(render_chain(&chain), "a → b → c → a");
    }

    #[test]
    fn render_single_element_chain() {
        assert_eq!(render_chain(&["a"]), "a");
    }

    #[test]
    fn render_empty_chain() {
        let chain: Vec<&str> = vec![];
        assert_eq!(render_chain(&chain), "");
    }

    #[test]
    fn shorten_simple_path() {
        assert_eq!(shorten_type_name("app::services::AuthenticationService"), "AuthenticationService");
    }

    #[test]
    fn shorten_with_generics() {
        assert_eq!(
            shorten_type_name("alloc::sync::Arc<dyn app::traits::Logger>"),
            "Arc<dyn Logger>"
        );
    }

    #[test]
    fn shorten_tuple() {
        assert_eq!(shorten_type_name("(alloc::string::String, u16)"), "(String, u16)");
    }

    #[test]
    fn shorten_no_path() {
        assert_eq!(shorten_type_name("String"), "String");
    }

    #[test]
    fn suggest_typo() {
        let declared = ["profile_mapper", "photo_mapper", "auth_service", "database"];
        let suggestions = suggest_similar("photo_maper", &declared, 3);
        assert_eq!(suggestions.first().map(String::as_str), Some("photo_mapper"));
    }

    #[test]
    fn suggest_substring_matches() {
        let declared = ["redis", "redis_pool", "s3"];
        let suggestions = suggest_similar("redis_poo", &declared, 3);
        assert_eq!(suggestions, vec!["redis", "redis_pool"]);
    }

    #[test]
    fn suggest_skips_exact_name() {
        let declared = ["database"];
        assert!(suggest_similar("database", &declared, 3).is_empty());
    }

    #[test]
    fn suggest_no_match() {
        let declared = ["database"];
        assert!(suggest_similar("xyz", &declared, 3).is_empty());
    }

    #[test]
    fn close_heuristic() {
        assert!(is_close("database", "databse"));
        assert!(!is_close("database", "logger"));
    }
}
