//! Markup repair for unreliable LLM output. Runs rewrite rules to a fixed
//! point so the parser only ever sees structure it can consume; the
//! contract is that `sanitize` never fails and is idempotent.

use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use crate::config;
use crate::label::ExpressionLabel;

use super::token::{render, tokenize, Token};

// Rule passes are monotone; in practice two iterations reach the fixed
// point, the bound is a safety net.
const MAX_PASSES: usize = 8;

pub fn sanitize(raw: &str) -> String {
    let mut current = raw.to_string();
    for _ in 0..MAX_PASSES {
        let next = sanitize_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn sanitize_once(input: &str) -> String {
    let mut tokens = tokenize(input);
    drop_denylisted(&mut tokens);
    repair_reused_openers(&mut tokens);
    cleanup_orphans(&mut tokens);
    strip_unknown(&mut tokens);
    normalize_whitespace(&render(&tokens))
}

/// Removes every tag of a denylisted label, paired or not, keeping the
/// content. Covers `<l>c</l>`, the reused-opener form `<l>c<l>`, and bare
/// leftovers in one sweep.
fn drop_denylisted(tokens: &mut Vec<Token>) {
    tokens.retain(|token| match token {
        Token::Open(label) | Token::Close(label) => {
            let keep = !config::is_denylisted(label);
            if !keep {
                debug!("sanitizer: dropping denylisted tag <{}>", label);
            }
            keep
        }
        Token::Text(_) => true,
    });
}

/// `<l>content<l>` with an allow-listed `l` is the common "opening tag
/// reused as closer" malformation; the second opener becomes `</l>`.
fn repair_reused_openers(tokens: &mut [Token]) {
    for label in ExpressionLabel::ALL {
        let name = label.as_str();
        let mut pending_open = false;
        for i in 0..tokens.len() {
            match &tokens[i] {
                Token::Open(l) if l == name => {
                    if pending_open {
                        debug!("sanitizer: rewriting reused opener <{}> as closer", name);
                        tokens[i] = Token::Close(name.to_string());
                        pending_open = false;
                    } else {
                        pending_open = true;
                    }
                }
                Token::Close(l) if l == name => pending_open = false,
                _ => {}
            }
        }
    }
}

/// Collapses adjacent malformed boundaries between tags that never found a
/// partner: orphan `</a><b>` becomes a space, orphan `</a></b>` is removed,
/// and adjacent orphan openers are left alone (the parser tolerates them).
fn cleanup_orphans(tokens: &mut Vec<Token>) {
    let orphan = mark_orphans(tokens);
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if matches!(tokens[i], Token::Close(_)) && orphan[i] {
            // peek past a whitespace-only gap
            let mut j = i + 1;
            if let Some(Token::Text(t)) = tokens.get(j) {
                if t.trim().is_empty() {
                    j += 1;
                }
            }
            match tokens.get(j) {
                Some(Token::Open(_)) if orphan[j] => {
                    out.push(Token::Text(" ".to_string()));
                    i = j + 1;
                    continue;
                }
                Some(Token::Close(_)) if orphan[j] => {
                    i = j + 1;
                    continue;
                }
                _ => {}
            }
        }
        out.push(tokens[i].clone());
        i += 1;
    }
    *tokens = out;
}

/// Pairs tags with a lenient stack walk (closers match the nearest open of
/// the same label); returns which tag tokens stayed unpaired.
fn mark_orphans(tokens: &[Token]) -> Vec<bool> {
    let mut orphan = vec![false; tokens.len()];
    let mut stack: Vec<(usize, String)> = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Open(label) => {
                orphan[i] = true;
                stack.push((i, label.clone()));
            }
            Token::Close(label) => {
                if let Some(pos) = stack.iter().rposition(|(_, l)| l == label) {
                    let (open_idx, _) = stack.remove(pos);
                    orphan[open_idx] = false;
                } else {
                    orphan[i] = true;
                }
            }
            Token::Text(_) => {}
        }
    }
    orphan
}

/// Tags that are neither actuatable nor passthrough are stripped, content
/// preserved.
fn strip_unknown(tokens: &mut Vec<Token>) {
    tokens.retain(|token| match token {
        Token::Open(label) | Token::Close(label) => {
            label.parse::<ExpressionLabel>().is_ok() || config::is_passthrough(label)
        }
        Token::Text(_) => true,
    });
}

fn normalize_whitespace(s: &str) -> String {
    static WS: OnceLock<Regex> = OnceLock::new();
    let ws = WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern"));
    ws.replace_all(s, " ").trim().to_string()
}
