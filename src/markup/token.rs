//! Shared tokenizer for the sanitizer and parser. A tag is
//! `<label>` / `</label>` with `label` = `[A-Za-z0-9_]+`; anything else,
//! including a lone `<`, is plain text.

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Token {
    /// `<label>`, label lowercased. Content case is preserved in `Text`.
    Open(String),
    /// `</label>`, label lowercased.
    Close(String),
    Text(String),
}

pub(crate) fn tokenize(input: &str) -> Vec<Token> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut text_start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'<' {
            if let Some((token, end)) = read_tag(input, i) {
                if text_start < i {
                    tokens.push(Token::Text(input[text_start..i].to_string()));
                }
                tokens.push(token);
                i = end;
                text_start = end;
                continue;
            }
        }
        // '<' is ASCII, so byte stepping never lands mid-character
        i += 1;
    }
    if text_start < bytes.len() {
        tokens.push(Token::Text(input[text_start..].to_string()));
    }
    tokens
}

fn read_tag(input: &str, start: usize) -> Option<(Token, usize)> {
    let bytes = input.as_bytes();
    let mut i = start + 1;
    let closing = bytes.get(i) == Some(&b'/');
    if closing {
        i += 1;
    }
    let label_start = i;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    if i == label_start || bytes.get(i) != Some(&b'>') {
        return None;
    }
    let label = input[label_start..i].to_ascii_lowercase();
    let token = if closing {
        Token::Close(label)
    } else {
        Token::Open(label)
    };
    Some((token, i + 1))
}

pub(crate) fn render(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        match token {
            Token::Open(label) => {
                out.push('<');
                out.push_str(label);
                out.push('>');
            }
            Token::Close(label) => {
                out.push_str("</");
                out.push_str(label);
                out.push('>');
            }
            Token::Text(text) => out.push_str(text),
        }
    }
    out
}
