use std::collections::BTreeMap;

use crate::error::{CookError, Result};

/// Whitespace separated wildcard tokens, applied left to right. A token
/// prefixed with `^` or `!` removes the names it matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamePattern {
    tokens: Vec<(bool, String)>,
}

impl NamePattern {
    pub fn parse(expr: &str) -> Self {
        Self {
            tokens: parse_pattern_tokens(expr),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn matches(&self, name: &str) -> bool {
        let mut selected = false;
        for (include, pattern) in &self.tokens {
            if glob_match(pattern, name) {
                selected = *include;
            }
        }
        selected
    }
}

/// Union of the groups selected by `expr`; `None` when the expression is
/// empty.
pub fn build_group_mask(
    groups: &BTreeMap<String, Vec<bool>>,
    expr: &str,
    len: usize,
) -> Option<Vec<bool>> {
    let pattern = NamePattern::parse(expr);
    if pattern.is_empty() {
        return None;
    }

    let mut mask = vec![false; len];
    for (name, values) in groups {
        if !pattern.matches(name) || values.len() != len {
            continue;
        }
        for (slot, value) in mask.iter_mut().zip(values.iter()) {
            *slot |= *value;
        }
    }
    Some(mask)
}

/// Integer selection made of `N`, `A-B` and `A-B:S` tokens. Ranges are
/// inclusive and may run downwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdPattern {
    ranges: Vec<IdRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IdRange {
    start: i64,
    end: i64,
    step: i64,
}

impl IdRange {
    fn contains(&self, id: i64) -> bool {
        let (low, high) = if self.start <= self.end {
            (self.start, self.end)
        } else {
            (self.end, self.start)
        };
        id >= low && id <= high && (id - self.start).rem_euclid(self.step) == 0
    }
}

impl IdPattern {
    pub fn parse(expr: &str) -> Result<Self> {
        let normalized = expr.replace(',', " ");
        let ranges = normalized
            .split_whitespace()
            .map(parse_id_token)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { ranges })
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn matches(&self, id: i64) -> bool {
        self.ranges.iter().any(|range| range.contains(id))
    }
}

fn parse_id_token(token: &str) -> Result<IdRange> {
    let invalid = || CookError::InvalidPattern(token.to_string());
    let (span, step) = match token.split_once(':') {
        Some((span, step)) => (span, step.parse::<i64>().map_err(|_| invalid())?),
        None => (token, 1),
    };
    if step <= 0 {
        return Err(invalid());
    }
    // A leading '-' belongs to the first number, not the range separator.
    let split = span
        .char_indices()
        .skip(1)
        .find(|(_, ch)| *ch == '-')
        .map(|(idx, _)| idx);
    let (start, end) = match split {
        Some(idx) => (&span[..idx], &span[idx + 1..]),
        None => (span, span),
    };
    let start = start.parse::<i64>().map_err(|_| invalid())?;
    let end = end.parse::<i64>().map_err(|_| invalid())?;
    Ok(IdRange { start, end, step })
}

fn parse_pattern_tokens(expr: &str) -> Vec<(bool, String)> {
    let mut tokens = Vec::new();
    let normalized = expr.replace(',', " ");
    for token in normalized.split_whitespace() {
        let (include, name) = match token.chars().next() {
            Some('^') | Some('!') => (false, &token[1..]),
            _ => (true, token),
        };
        if !name.is_empty() {
            tokens.push((include, name.to_string()));
        }
    }
    tokens
}

pub fn glob_match(pattern: &str, value: &str) -> bool {
    glob_match_inner(pattern.as_bytes(), value.as_bytes())
}

fn glob_match_inner(pattern: &[u8], value: &[u8]) -> bool {
    if pattern.is_empty() {
        return value.is_empty();
    }
    match pattern[0] {
        b'*' => {
            for idx in 0..=value.len() {
                if glob_match_inner(&pattern[1..], &value[idx..]) {
                    return true;
                }
            }
            false
        }
        b'?' => {
            if value.is_empty() {
                false
            } else {
                glob_match_inner(&pattern[1..], &value[1..])
            }
        }
        ch => {
            if value.first().copied() == Some(ch) {
                glob_match_inner(&pattern[1..], &value[1..])
            } else {
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_matches_any_positive_token() {
        let pattern = NamePattern::parse("Cd  piece*");
        assert!(pattern.matches("Cd"));
        assert!(pattern.matches("piece12"));
        assert!(!pattern.matches("Alpha"));
    }

    #[test]
    fn negated_token_removes_earlier_matches() {
        let pattern = NamePattern::parse("* ^P");
        assert!(pattern.matches("Cd"));
        assert!(!pattern.matches("P"));
    }

    #[test]
    fn empty_pattern_matches_nothing() {
        let pattern = NamePattern::parse("   ");
        assert!(pattern.is_empty());
        assert!(!pattern.matches("anything"));
    }

    #[test]
    fn id_pattern_reads_numbers_and_ranges() {
        let pattern = IdPattern::parse("3 10-12, 20-30:5 9-7").expect("pattern");
        for id in [3, 10, 11, 12, 20, 25, 30, 7, 8, 9] {
            assert!(pattern.matches(id), "{id}");
        }
        for id in [4, 13, 21, 6, 31] {
            assert!(!pattern.matches(id), "{id}");
        }
    }

    #[test]
    fn id_pattern_accepts_negative_ids() {
        let pattern = IdPattern::parse("-2 -5--4").expect("pattern");
        assert!(pattern.matches(-2));
        assert!(pattern.matches(-4));
        assert!(pattern.matches(-5));
        assert!(!pattern.matches(-3));
    }

    #[test]
    fn id_pattern_rejects_garbage() {
        assert_eq!(
            IdPattern::parse("1 x-3"),
            Err(CookError::InvalidPattern("x-3".to_string()))
        );
        assert!(IdPattern::parse("1-4:0").is_err());
        assert!(IdPattern::parse("  ").expect("empty").is_empty());
    }

    #[test]
    fn group_mask_unions_selected_groups() {
        let groups = BTreeMap::from([
            ("left".to_string(), vec![true, false, false]),
            ("right".to_string(), vec![false, false, true]),
            ("top".to_string(), vec![false, true, false]),
        ]);
        let mask = build_group_mask(&groups, "left right", 3).expect("mask");
        assert_eq!(mask, vec![true, false, true]);
        assert!(build_group_mask(&groups, "", 3).is_none());
    }
}
