use regex::Regex;
use std::sync::OnceLock;

/// Everything outside this class is OCR noise: Latin letters, digits,
/// Latin-1 accented letters, whitespace, and the literals `' / ، . -`.
/// The `،` is the Arabic separator and is intentionally preserved; Arabic
/// letters themselves are not, so Arabic document content is discarded.
/// Known limitation, kept as-is.
fn re_noise() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"[^A-Za-z0-9À-ÿ\s'/،.-]").expect("invalid regex"))
}

fn re_multi_whitespace() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"\s{2,}").expect("invalid regex"))
}

/// Clean raw OCR output: strip noise characters, drop blank lines, collapse
/// whitespace runs to a single space, and trim. Idempotent.
pub fn normalize(raw: &str) -> String {
    let stripped = re_noise().replace_all(raw, "");
    let kept: Vec<&str> = stripped
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect();
    let joined = kept.join("\n");
    let collapsed = re_multi_whitespace().replace_all(&joined, " ");
    collapsed.trim().to_string()
}
