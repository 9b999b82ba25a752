use once_cell::sync::Lazy;
use regex::Regex;

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("static regex"));

/// `" Loyalty Points (Num) "` → `"loyalty_points_num"`.
pub fn normalize_column_name(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    NON_ALNUM
        .replace_all(&lower, "_")
        .trim_matches('_')
        .to_string()
}
