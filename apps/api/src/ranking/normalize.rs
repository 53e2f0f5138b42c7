/// Normalizes raw resume text for keyword matching: lower-case, whitespace tokens,
/// punctuation-only tokens dropped, survivors joined by single spaces.
///
/// Leading/trailing sentence punctuation is peeled off each token ("Java," → "java")
/// while inner and symbolic characters are kept ("node.js", "c++", "c#").
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(trim_token)
        .filter(|token| token.chars().any(char::is_alphanumeric))
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

const EDGE_PUNCTUATION: &[char] = &[
    '.', ',', ';', ':', '!', '?', '(', ')', '[', ']', '{', '}', '"', '\'', '`', '«', '»', '“',
    '”', '‘', '’', '•', '·', '|', '/', '\\', '*',
];

fn trim_token(token: &str) -> &str {
    token.trim_matches(|c: char| EDGE_PUNCTUATION.contains(&c) || c == '-' || c == '–')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_gives_empty_output() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \n\t  "), "");
    }

    #[test]
    fn test_lowercases_and_collapses_whitespace() {
        assert_eq!(normalize("Senior   Rust\nEngineer\t"), "senior rust engineer");
    }

    #[test]
    fn test_drops_punctuation_only_tokens() {
        assert_eq!(normalize("Skills : Rust , Go - ; ."), "skills rust go");
    }

    #[test]
    fn test_peels_sentence_punctuation() {
        assert_eq!(normalize("I use Java, (daily)."), "i use java daily");
    }

    #[test]
    fn test_keeps_symbolic_tech_names() {
        assert_eq!(normalize("C++, C# and Node.js."), "c++ c# and node.js");
    }

    #[test]
    fn test_bullets_are_removed() {
        assert_eq!(normalize("• Kubernetes\n• Terraform"), "kubernetes terraform");
    }
}
