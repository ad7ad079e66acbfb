use std::collections::HashSet;

/// Trim whitespace, a leading UTF-8 BOM, and outer quotes from a header cell.
pub fn clean_header(raw: &str) -> String {
    let trimmed = raw.trim_start_matches('\u{feff}').trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Make header names unique: a repeated `x` becomes `x.1`, `x.2`, ...
pub fn dedupe_headers<I>(headers: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let headers: Vec<String> = headers.into_iter().collect();
    let mut taken: HashSet<String> = HashSet::with_capacity(headers.len());
    let mut out = Vec::with_capacity(headers.len());

    for name in headers {
        if taken.insert(name.clone()) {
            out.push(name);
            continue;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}.{}", name, n);
            if taken.insert(candidate.clone()) {
                out.push(candidate);
                break;
            }
            n += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_bom_and_quotes() {
        assert_eq!(clean_header("\u{feff}id"), "id");
        assert_eq!(clean_header("  \"name\" "), "name");
        assert_eq!(clean_header("plain"), "plain");
    }

    #[test]
    fn repeats_get_numbered() {
        let out = dedupe_headers(vec!["a".into(), "b".into(), "a".into(), "a".into()]);
        assert_eq!(out, vec!["a", "b", "a.1", "a.2"]);
    }

    #[test]
    fn numbering_skips_existing_names() {
        let out = dedupe_headers(vec!["a".into(), "a.1".into(), "a".into()]);
        assert_eq!(out, vec!["a", "a.1", "a.2"]);
    }
}
