//! Hand-written operator tokenizer.
//!
//! Recognized forms, applied left to right: `site:`, `-site:`, `filetype:`,
//! `inurl:`, `intitle:`, `intext:`, `before:YYYY-MM-DD`, `after:YYYY-MM-DD`,
//! `"exact phrase"` and word-final `-excluded`. Anything unrecognized stays
//! in the cleaned text; an operator with an invalid date stays as literal
//! text rather than raising an error.

use chrono::NaiveDate;

use super::QueryFilters;

#[derive(Debug, Default)]
pub struct ParsedText {
    /// Operator-free text with whitespace collapsed.
    pub text: String,
    pub filters: QueryFilters,
}

/// Split raw text into tokens, treating double-quoted runs as one token.
fn split_tokens(raw: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in raw.chars() {
        match ch {
            '"' => {
                current.push('"');
                if in_quotes {
                    tokens.push(std::mem::take(&mut current));
                }
                in_quotes = !in_quotes;
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Strip operators out of `raw`, returning the cleaned text and filters.
pub fn tokenize(raw: &str) -> ParsedText {
    let mut filters = QueryFilters::default();
    let mut words: Vec<String> = Vec::new();

    for token in split_tokens(raw) {
        // "exact phrase"
        if token.len() >= 2 && token.starts_with('"') && token.ends_with('"') {
            let phrase = token[1..token.len() - 1].trim().to_string();
            if !phrase.is_empty() {
                filters.exact_phrases.push(phrase);
            }
            continue;
        }

        // -site:example.com and -word
        if let Some(negated) = token.strip_prefix('-') {
            if let Some(site) = negated.strip_prefix("site:") {
                if !site.is_empty() {
                    filters.exclude_sites.push(site.to_ascii_lowercase());
                    continue;
                }
            } else if !negated.is_empty() && !negated.contains(':') {
                filters.exclude_terms.push(negated.to_string());
                continue;
            }
            words.push(token);
            continue;
        }

        match token.split_once(':') {
            Some(("site", value)) if !value.is_empty() => {
                filters.site = Some(value.to_ascii_lowercase());
            }
            Some(("filetype", value)) if !value.is_empty() => {
                filters.file_types.push(value.to_ascii_lowercase());
            }
            Some(("inurl", value)) if !value.is_empty() => {
                filters.in_url = Some(value.to_string());
            }
            Some(("intitle", value)) if !value.is_empty() => {
                filters.in_title = Some(value.to_string());
            }
            Some(("intext", value)) if !value.is_empty() => {
                filters.in_text = Some(value.to_string());
            }
            Some(("before", value)) => match parse_date(value) {
                Some(date) => filters.date_before = Some(date),
                None => words.push(token),
            },
            Some(("after", value)) => match parse_date(value) {
                Some(date) => filters.date_after = Some(date),
                None => words.push(token),
            },
            _ => words.push(token),
        }
    }

    ParsedText {
        text: words.join(" "),
        filters,
    }
}
