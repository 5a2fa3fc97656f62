//! Tokenizers shared by the built-in metrics.

/// Split into word and punctuation tokens, preserving case.
///
/// Runs of alphanumeric characters (plus in-word apostrophes) form one token;
/// every other non-whitespace character is a token on its own.
pub fn words_and_punct(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        let in_word_apostrophe = c == '\''
            && !current.is_empty()
            && chars.peek().is_some_and(|n| n.is_alphanumeric());
        if c.is_alphanumeric() || in_word_apostrophe {
            current.push(c);
            continue;
        }
        if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
        if !c.is_whitespace() {
            tokens.push(c.to_string());
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Lower-cased alphanumeric tokens; punctuation acts as a separator.
pub fn normalized_words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}
