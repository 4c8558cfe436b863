/// A word-aligned slice of a raw transcript, sized for a single backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    /// 1-based position within the split.
    pub index: usize,
    pub total: usize,
}

impl Chunk {
    /// Character length (not bytes) of the chunk text.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Split `text` into chunks of at most `max_chars` characters, breaking only
/// on whitespace.
///
/// Words are packed greedily, counting one separating space per additional
/// word. A word longer than `max_chars` is never split: it lands alone in its
/// own chunk. Blank input yields no chunks.
pub fn split(text: &str, max_chars: usize) -> Vec<Chunk> {
    let max_chars = max_chars.max(1);
    let mut groups: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        let added = word_len + usize::from(!current.is_empty());

        if !current.is_empty() && current_len + added > max_chars {
            groups.push(std::mem::take(&mut current));
            current.push(word);
            current_len = word_len;
        } else {
            current.push(word);
            current_len += added;
        }
    }

    if !current.is_empty() {
        groups.push(current);
    }

    let total = groups.len();
    groups
        .into_iter()
        .enumerate()
        .map(|(i, words)| Chunk {
            text: words.join(" "),
            index: i + 1,
            total,
        })
        .collect()
}
