const WILDCARD: char = '*';

/// Matches `name` against a single pattern token where `*` matches any run of
/// characters (including none). Matching is case-sensitive.
pub fn glob_match(pattern: &str, name: &str) -> bool {
    if !pattern.contains(WILDCARD) {
        return pattern == name;
    }

    let parts: Vec<&str> = pattern.split(WILDCARD).collect();
    let (first, rest) = match parts.split_first() {
        Some(split) => split,
        None => return false,
    };
    let Some(mut remaining) = name.strip_prefix(first) else {
        return false;
    };
    let Some((last, middle)) = rest.split_last() else {
        return remaining.is_empty();
    };

    for part in middle {
        match remaining.find(part) {
            Some(pos) => remaining = &remaining[pos + part.len()..],
            None => return false,
        }
    }
    remaining.len() >= last.len() && remaining.ends_with(last)
}

/// Splits a pattern into its whitespace-separated tokens.
pub fn tokens(pattern: &str) -> impl Iterator<Item = &str> {
    pattern.split_whitespace()
}

/// Returns `true` if `name` can be used as an object, selection or group name.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(WILDCARD) && !name.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_pattern_requires_exact_match() {
        assert!(glob_match("s1_pep1", "s1_pep1"));
        assert!(!glob_match("s1_pep1", "s1_pep10"));
        assert!(!glob_match("S1_pep1", "s1_pep1"));
    }

    #[test]
    fn trailing_wildcard_matches_prefix() {
        assert!(glob_match("test*", "test_s1_pep1"));
        assert!(glob_match("test*", "test"));
        assert!(!glob_match("test*", "nr_test"));
    }

    #[test]
    fn inner_and_leading_wildcards_match() {
        assert!(glob_match("nr_s1_*_3", "nr_s1_pep2_3"));
        assert!(!glob_match("nr_s1_*_3", "nr_s1_pep2_13x"));
        assert!(glob_match("*_pep1", "s2_pep1"));
        assert!(glob_match("*", "anything"));
        assert!(glob_match("a*b*c", "abc"));
        assert!(!glob_match("ab*ba", "aba"));
    }

    #[test]
    fn tokens_split_on_whitespace() {
        let t: Vec<_> = tokens(" s1_pep1  s1_pep2\ts2_*").collect();
        assert_eq!(t, vec!["s1_pep1", "s1_pep2", "s2_*"]);
    }

    #[test]
    fn valid_names_reject_wildcards_and_whitespace() {
        assert!(is_valid_name("nr_s1_pep1_0"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("a b"));
        assert!(!is_valid_name("test*"));
    }
}
