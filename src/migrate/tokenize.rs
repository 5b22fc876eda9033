/// Splits a comma separated genre list and trims each piece.
///
/// Order and duplicates are kept and case is left alone. A missing list
/// becomes an empty sequence; an empty string is a single empty token.
pub fn tokenize_genres(genres: Option<&str>) -> Vec<String> {
    match genres {
        Some(genres) => genres.split(',').map(|g| g.trim().to_string()).collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_and_trim() {
        assert_eq!(
            tokenize_genres(Some(" Action, Drama ,Sci-Fi")),
            vec!["Action", "Drama", "Sci-Fi"]
        );
    }

    #[test]
    fn test_keeps_duplicates_and_case() {
        assert_eq!(
            tokenize_genres(Some("drama, Drama,drama")),
            vec!["drama", "Drama", "drama"]
        );
    }

    #[test]
    fn test_missing_genres() {
        assert!(tokenize_genres(None).is_empty());
    }

    #[test]
    fn test_empty_pieces() {
        assert_eq!(tokenize_genres(Some("")), vec![""]);
        assert_eq!(tokenize_genres(Some("Action,,  ,")), vec!["Action", "", "", ""]);
    }

    #[test]
    fn test_other_whitespace() {
        assert_eq!(
            tokenize_genres(Some("\tComedy\n,\u{00a0}Romance ")),
            vec!["Comedy", "Romance"]
        );
    }

    #[test]
    fn test_token_count_matches_commas() {
        let samples = [
            "Action",
            " Action, Drama ,Sci-Fi",
            ",",
            "  ,  ,  ",
            "Documentary,Music,History,War",
            "Crime ,",
        ];
        for s in samples {
            let tokens = tokenize_genres(Some(s));
            assert_eq!(tokens.len(), s.matches(',').count() + 1, "input {:?}", s);
            for t in &tokens {
                assert_eq!(t, t.trim(), "token {:?} of {:?}", t, s);
            }
        }
    }

    #[test]
    fn test_tokenizing_tokens_is_stable() {
        let once = tokenize_genres(Some(" Family , Animation"));
        let again = tokenize_genres(Some(&once.join(",")));
        assert_eq!(once, again);
    }
}
