use std::path::PathBuf;

/// Expand a leading `~` or `~/…` to the user's home directory.
/// Other `~user` forms are left untouched.
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Split `text` into chunks of at most `limit` bytes, preferring line
/// boundaries so chat messages stay readable. Bounding by bytes keeps every
/// chunk within any character-counted limit as well, since a char's UTF-8
/// byte length is never smaller than its UTF-16 length.
pub fn chunk_text(text: &str, limit: usize) -> Vec<String> {
    if text.len() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    for line in text.split_inclusive('\n') {
        if current.len() + line.len() > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        if line.len() > limit {
            // A single oversized line is split on char boundaries.
            let mut start = 0;
            for (idx, ch) in line.char_indices() {
                if idx + ch.len_utf8() - start > limit {
                    chunks.push(line[start..idx].to_string());
                    start = idx;
                }
            }
            current.push_str(&line[start..]);
        } else {
            current.push_str(line);
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
