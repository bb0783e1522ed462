//! Accent- and case-insensitive text keys.

/// Fold a string into a comparison key: transliterate to ASCII, then lowercase.
///
/// `"São Paulo"` and `"SAO PAULO"` both fold to `"sao paulo"`.
pub fn fold_key(s: &str) -> String {
    deunicode::deunicode(s).to_lowercase()
}

/// Split a folded key into alphanumeric words.
pub fn folded_words(s: &str) -> impl Iterator<Item = String> {
    fold_key(s)
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>()
        .into_iter()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_accents_and_case() {
        assert_eq!(fold_key("São Paulo"), "sao paulo");
        assert_eq!(fold_key("GOIÂNIA"), "goiania");
        assert_eq!(fold_key("Itaú de Minas"), "itau de minas");
    }

    #[test]
    fn test_words_split_on_punctuation() {
        let words: Vec<_> = folded_words("Jardim-Paulista (Zona Sul)").collect();
        assert_eq!(words, vec!["jardim", "paulista", "zona", "sul"]);
    }
}
