//! Query tokenizer.

use super::parser::AliasTable;
use super::{parse_count, QueryError};

/// A lexical token of the query grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Bare lowercase word
    Word(String),
    /// Quoted phrase, never merged with neighbours
    Phrase(String),
    /// Count modifier applying to the next word or phrase, with its source word
    Count { value: u32, word: String },
    And,
    Or,
    LParen,
    RParen,
    /// Alias phrase, already expanded to its OR-groups
    Alias(Vec<Vec<String>>),
}

#[derive(Debug)]
enum Raw {
    Word(String),
    Phrase(String),
    LParen,
    RParen,
}

/// Split query text into tokens, expanding aliases.
///
/// Aliases match longest phrase first and take precedence over count
/// words, so an alias like `no luck` is never read as a count.
pub fn tokenize(input: &str, aliases: &AliasTable) -> Result<Vec<Token>, QueryError> {
    let raw = scan(input)?;
    let mut tokens = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        match &raw[i] {
            Raw::LParen => tokens.push(Token::LParen),
            Raw::RParen => tokens.push(Token::RParen),
            Raw::Phrase(p) => match aliases.get(p) {
                Some(groups) => tokens.push(Token::Alias(groups.clone())),
                None => tokens.push(Token::Phrase(p.clone())),
            },
            Raw::Word(_) => {
                if let Some((groups, used)) = match_alias(&raw[i..], aliases) {
                    tokens.push(Token::Alias(groups.clone()));
                    i += used;
                    continue;
                }
                if let Raw::Word(w) = &raw[i] {
                    tokens.push(classify(w));
                }
            }
        }
        i += 1;
    }

    Ok(tokens)
}

fn classify(word: &str) -> Token {
    match word {
        "and" => Token::And,
        "or" => Token::Or,
        _ => match parse_count(word) {
            Some(value) => Token::Count {
                value,
                word: word.to_string(),
            },
            None => Token::Word(word.to_string()),
        },
    }
}

/// Longest alias starting at the head of `raw`, with the number of words used.
fn match_alias<'a>(raw: &[Raw], aliases: &'a AliasTable) -> Option<(&'a Vec<Vec<String>>, usize)> {
    let run: Vec<&str> = raw
        .iter()
        .map_while(|r| match r {
            Raw::Word(w) => Some(w.as_str()),
            _ => None,
        })
        .take(aliases.max_words())
        .collect();

    (1..=run.len())
        .rev()
        .find_map(|n| aliases.get(&run[..n].join(" ")).map(|groups| (groups, n)))
}

fn scan(input: &str) -> Result<Vec<Raw>, QueryError> {
    let mut raw = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                raw.push(Raw::LParen);
            }
            ')' => {
                chars.next();
                raw.push(Raw::RParen);
            }
            '"' => {
                chars.next();
                let mut phrase = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '"' {
                        closed = true;
                        break;
                    }
                    phrase.push(c);
                }
                if !closed {
                    return Err(QueryError::Syntax("unterminated quote".to_string()));
                }
                let phrase = normalize_phrase(&phrase);
                if !phrase.is_empty() {
                    raw.push(Raw::Phrase(phrase));
                }
            }
            _ => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || c == '(' || c == ')' || c == '"' {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                raw.push(Raw::Word(word.to_lowercase()));
            }
        }
    }

    Ok(raw)
}

fn normalize_phrase(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aliases() -> AliasTable {
        AliasTable::from_pairs([
            ("warded", vec![vec!["lw"], vec!["bw"]]),
            ("no luck", vec![vec!["randomhitchance false"]]),
        ])
    }

    #[test]
    fn test_tokenize_operators_case_insensitive() {
        let tokens = tokenize("Knight AND scout Or (mage)", &AliasTable::default()).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Word("knight".into()),
                Token::And,
                Token::Word("scout".into()),
                Token::Or,
                Token::LParen,
                Token::Word("mage".into()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_tokenize_counts() {
        let tokens = tokenize("double knight 3 scout no mage", &AliasTable::default()).unwrap();
        assert_eq!(tokens[0], Token::Count { value: 2, word: "double".into() });
        assert_eq!(tokens[2], Token::Count { value: 3, word: "3".into() });
        assert_eq!(tokens[4], Token::Count { value: 0, word: "no".into() });
    }

    #[test]
    fn test_tokenize_quoted_phrase() {
        let tokens = tokenize(r#""Iron   Fist" knight"#, &AliasTable::default()).unwrap();
        assert_eq!(tokens[0], Token::Phrase("iron fist".into()));
        assert_eq!(tokens[1], Token::Word("knight".into()));
    }

    #[test]
    fn test_tokenize_unterminated_quote() {
        let err = tokenize(r#""iron fist"#, &AliasTable::default()).unwrap_err();
        assert!(matches!(err, QueryError::Syntax(_)));
    }

    #[test]
    fn test_alias_beats_count_word() {
        let tokens = tokenize("no luck", &aliases()).unwrap();
        assert_eq!(
            tokens,
            vec![Token::Alias(vec![vec!["randomhitchance false".to_string()]])]
        );
    }

    #[test]
    fn test_alias_single_word() {
        let tokens = tokenize("Warded knight", &aliases()).unwrap();
        assert!(matches!(&tokens[0], Token::Alias(groups) if groups.len() == 2));
        assert_eq!(tokens[1], Token::Word("knight".into()));
    }

    #[test]
    fn test_parens_split_words() {
        let tokens = tokenize("(knight)or(scout)", &AliasTable::default()).unwrap();
        assert_eq!(tokens.len(), 7);
        assert_eq!(tokens[3], Token::Or);
    }
}
