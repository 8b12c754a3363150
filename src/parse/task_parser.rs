/// Split a string into title and tags. Tags are `#word` tokens at the end.
pub fn parse_title_and_tags(s: &str) -> (String, Vec<String>) {
    let mut tags = Vec::new();
    let mut remaining = s.trim();

    while !remaining.is_empty() {
        let (head, last_word) = remaining
            .rsplit_once(char::is_whitespace)
            .unwrap_or(("", remaining));
        match tag_token(last_word) {
            Some(tag) => {
                tags.push(tag.to_string());
                remaining = head.trim_end();
            }
            None => break,
        }
    }

    tags.reverse();
    (remaining.to_string(), tags)
}

/// `#word` → `word`. Rejects bare `#` and words with a second `#`.
fn tag_token(word: &str) -> Option<&str> {
    let tag = word.strip_prefix('#')?;
    if tag.is_empty() || tag.contains('#') {
        return None;
    }
    Some(tag)
}

/// Normalize a user-supplied tag: trim, drop one leading `#`, lowercase
pub fn normalize_tag(tag: &str) -> Option<String> {
    let tag = tag.trim();
    let tag = tag.strip_prefix('#').unwrap_or(tag).trim();
    if tag.is_empty() {
        None
    } else {
        Some(tag.to_lowercase())
    }
}

/// Merge tag lists in order, normalizing and dropping duplicates. Each
/// input item may itself be a comma-separated list.
pub fn merge_tags<'a>(lists: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in lists.into_iter().flat_map(|item| item.split(',')) {
        if let Some(tag) = normalize_tag(tag)
            && !out.contains(&tag)
        {
            out.push(tag);
        }
    }
    out
}
