use chrono::Utc;
use scraper::Html;

/// Strip markup from an HTML fragment, collapsing whitespace runs.
/// Empty or tag-only input yields an empty string.
pub fn strip_html(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    let fragment = Html::parse_fragment(html);
    let text = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Like [`strip_html`] but maps empty results to None.
pub fn strip_html_opt(html: Option<&str>) -> Option<String> {
    let stripped = strip_html(html?);
    if stripped.is_empty() {
        None
    } else {
        Some(stripped)
    }
}

/// URL-safe slug with a UTC `yyyyMMddHHmmss` suffix so two articles with
/// the same title still get distinct slugs.
pub fn generate_slug(title: &str) -> String {
    let mut stem = slugify(title);
    if stem.is_empty() {
        stem = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
    }
    format!("{}-{}", stem, Utc::now().format("%Y%m%d%H%M%S"))
}

/// Lower-case, diacritics folded, non-alphanumeric characters dropped,
/// whitespace runs collapsed to single hyphens, capped at 200 chars.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let folded: String = lowered.chars().map(fold_diacritic).collect();

    let cleaned: String = folded
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-')
        .collect();

    let mut slug = String::with_capacity(cleaned.len());
    let mut prev_hyphen = true; // suppress leading hyphens
    for c in cleaned.chars() {
        if c == ' ' || c == '-' {
            if !prev_hyphen {
                slug.push('-');
            }
            prev_hyphen = true;
        } else {
            slug.push(c);
            prev_hyphen = false;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }

    if slug.chars().count() > 200 {
        slug = slug.chars().take(200).collect();
        while slug.ends_with('-') {
            slug.pop();
        }
    }

    slug
}

// Latin accent folding. Characters outside the table pass through, which
// keeps non-Latin scripts intact in slugs.
fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}
