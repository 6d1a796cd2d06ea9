//! Slugs for bucket names and object keys.

/// S3 bucket names top out at 63 characters.
pub const MAX_BUCKET_LEN: usize = 63;

fn fold(c: char) -> Option<char> {
    let folded = match c {
        'a'..='z' | '0'..='9' => c,
        'A'..='Z' => c.to_ascii_lowercase(),
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'a',
        'ç' | 'Ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => 'i',
        'ñ' | 'Ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => 'o',
        'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => 'u',
        'ý' | 'ÿ' | 'Ý' => 'y',
        _ => return None,
    };
    Some(folded)
}

/// Lowercase ASCII alphanumerics; every other run of characters collapses
/// into one `-`, never leading or trailing.
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars() {
        match fold(c) {
            Some(c) => {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push(c);
            }
            None => pending_dash = true,
        }
    }

    slug
}

/// Object key for an uploaded file name. The extension survives:
/// `My Report (v2).PDF` becomes `my-report-v2.pdf`.
#[must_use]
pub fn file_key(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) => {
            let stem = slugify(stem);
            let ext = slugify(ext);
            match (stem.is_empty(), ext.is_empty()) {
                (false, false) => format!("{stem}.{ext}"),
                (false, true) => stem,
                (true, _) => ext,
            }
        }
        None => slugify(file_name),
    }
}

/// Bucket name for a repository display name, or `None` when the name has no
/// usable characters.
#[must_use]
pub fn bucket_name(prefix: &str, display_name: &str) -> Option<String> {
    let slug = slugify(display_name);
    if slug.is_empty() {
        return None;
    }

    let mut name = format!("{prefix}{slug}");
    name.truncate(MAX_BUCKET_LEN);
    let name = name.trim_end_matches('-').to_string();

    Some(name)
}

/// Last path segment of a client-supplied file name.
#[must_use]
pub fn base_name(file_name: &str) -> &str {
    file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name)
        .trim()
}
