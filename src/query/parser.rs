//! Recursive-descent parser producing OR-of-AND term groups.

use std::collections::{HashMap, HashSet};

use super::lexer::{tokenize, Token};
use super::QueryError;

/// OR-alternatives, each an AND-ed list of terms.
pub type TermGroups = Vec<Vec<String>>;

/// Deepest parenthesis nesting a query may use.
pub const MAX_NESTING: usize = 32;

/// Most OR-alternatives a query may expand to.
pub const MAX_ALTERNATIVES: usize = 256;

/// Phrases that expand to OR-groups of underlying terms.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: HashMap<String, TermGroups>,
    max_words: usize,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(phrase, groups)` pairs.
    pub fn from_pairs<I, P, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (P, Vec<Vec<T>>)>,
        P: AsRef<str>,
        T: AsRef<str>,
    {
        let mut table = Self::new();
        for (phrase, groups) in pairs {
            let groups = groups
                .into_iter()
                .map(|g| g.into_iter().map(|t| t.as_ref().to_string()).collect())
                .collect();
            table.insert(phrase.as_ref(), groups);
        }
        table
    }

    /// Register an alias. Phrase and terms are matched case-insensitively.
    pub fn insert(&mut self, phrase: &str, groups: TermGroups) {
        let words: Vec<String> = phrase.split_whitespace().map(str::to_lowercase).collect();
        if words.is_empty() {
            return;
        }
        self.max_words = self.max_words.max(words.len());

        let groups = groups
            .into_iter()
            .map(|g| g.into_iter().map(|t| t.to_lowercase()).collect())
            .collect();
        self.entries.insert(words.join(" "), groups);
    }

    pub fn get(&self, phrase: &str) -> Option<&TermGroups> {
        self.entries.get(phrase)
    }

    /// Word count of the longest alias phrase.
    pub fn max_words(&self) -> usize {
        self.max_words
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TermKind {
    Bare,
    Counted,
    Quoted,
}

#[derive(Debug, Clone)]
enum Value {
    Term { text: String, kind: TermKind },
    Group(TermGroups),
    And,
    Or,
}

/// Query text parser bound to one alias table.
///
/// Keyword phrases are known so that a count word opening a keyword
/// (`single file`) stays part of it.
#[derive(Debug, Clone, Default)]
pub struct QueryGrammar {
    aliases: AliasTable,
    keywords: HashSet<String>,
    max_keyword_words: usize,
}

impl QueryGrammar {
    pub fn new(aliases: AliasTable) -> Self {
        Self {
            aliases,
            ..Self::default()
        }
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Replace the alias table, keeping registered keywords.
    pub fn set_aliases(&mut self, aliases: AliasTable) {
        self.aliases = aliases;
    }

    /// Register a lowercase, whitespace-normalized keyword phrase.
    pub fn add_keyword(&mut self, phrase: &str) {
        let words = phrase.split_whitespace().count();
        if words == 0 {
            return;
        }
        self.max_keyword_words = self.max_keyword_words.max(words);
        self.keywords.insert(phrase.to_string());
    }

    /// Whether `word` followed by some of `rest` spells a keyword.
    fn opens_keyword(&self, word: &str, rest: &[Token]) -> bool {
        let mut phrase = word.to_string();
        if self.keywords.contains(&phrase) {
            return true;
        }
        for token in rest.iter().take(self.max_keyword_words.saturating_sub(1)) {
            let Token::Word(next) = token else {
                break;
            };
            phrase.push(' ');
            phrase.push_str(next);
            if self.keywords.contains(&phrase) {
                return true;
            }
        }
        false
    }

    /// Parse query text into sorted, deduplicated term groups.
    ///
    /// An empty query yields a single empty group, which matches everything.
    pub fn parse(&self, text: &str) -> Result<TermGroups, QueryError> {
        let tokens = tokenize(text, &self.aliases)?;
        let mut cursor = Cursor {
            grammar: self,
            tokens: &tokens,
            pos: 0,
        };

        let groups = cursor.parse_expr(0)?;
        if let Some(token) = cursor.peek() {
            return Err(QueryError::Syntax(format!("unexpected {:?}", token)));
        }

        Ok(normalize(groups))
    }
}

struct Cursor<'a> {
    grammar: &'a QueryGrammar,
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    /// Parse until end of input or a closing parenthesis (left unconsumed).
    fn parse_expr(&mut self, depth: usize) -> Result<TermGroups, QueryError> {
        let mut values = Vec::new();

        while let Some(token) = self.peek() {
            match token {
                Token::RParen if depth == 0 => {
                    return Err(QueryError::Syntax("unbalanced ')'".to_string()));
                }
                Token::RParen => break,
                Token::LParen => {
                    if depth >= MAX_NESTING {
                        return Err(QueryError::Syntax(format!(
                            "parentheses nest deeper than {}",
                            MAX_NESTING
                        )));
                    }
                    self.pos += 1;
                    let inner = self.parse_expr(depth + 1)?;
                    self.expect_close()?;
                    values.push(Value::Group(inner));
                }
                Token::Count { word, .. }
                    if self.grammar.opens_keyword(word, &self.tokens[self.pos + 1..]) =>
                {
                    self.pos += 1;
                    values.push(Value::Term {
                        text: word.clone(),
                        kind: TermKind::Bare,
                    });
                }
                Token::Count { .. } => values.push(self.parse_counted()?),
                _ => {
                    let value = match token {
                        Token::Word(w) => Value::Term {
                            text: w.clone(),
                            kind: TermKind::Bare,
                        },
                        Token::Phrase(p) => Value::Term {
                            text: p.clone(),
                            kind: TermKind::Quoted,
                        },
                        Token::Alias(groups) => Value::Group(groups.clone()),
                        Token::And => Value::And,
                        _ => Value::Or,
                    };
                    self.pos += 1;
                    values.push(value);
                }
            }
        }

        let values = merge_compounds(values);
        let mut groups = Vec::new();
        for branch in values.split(|v| matches!(v, Value::Or)) {
            if branch.iter().all(|v| matches!(v, Value::And)) {
                continue;
            }
            groups.extend(fold_branch(branch)?);
            if groups.len() > MAX_ALTERNATIVES {
                return Err(too_many_alternatives());
            }
        }
        if groups.is_empty() {
            groups.push(Vec::new());
        }
        Ok(groups)
    }

    fn parse_counted(&mut self) -> Result<Value, QueryError> {
        let count = match self.next() {
            Some(Token::Count { value, .. }) => *value,
            _ => return Err(QueryError::Syntax("expected a count".to_string())),
        };

        match self.next() {
            Some(Token::Word(w)) => Ok(Value::Term {
                text: format!("{} {}", count, w),
                kind: TermKind::Counted,
            }),
            Some(Token::Phrase(p)) => Ok(Value::Term {
                text: format!("{} {}", count, p),
                kind: TermKind::Quoted,
            }),
            Some(other) => Err(QueryError::Syntax(format!(
                "count {} cannot apply to {:?}",
                count, other
            ))),
            None => Err(QueryError::Syntax(format!(
                "count {} at end of query",
                count
            ))),
        }
    }

    fn expect_close(&mut self) -> Result<(), QueryError> {
        match self.next() {
            Some(Token::RParen) => Ok(()),
            _ => Err(QueryError::Syntax("unbalanced '('".to_string())),
        }
    }
}

/// Join runs of bare words into compound terms.
///
/// A counted term starts a compound that following bare words extend;
/// quoted phrases neither absorb nor extend.
fn merge_compounds(values: Vec<Value>) -> Vec<Value> {
    let mut merged: Vec<Value> = Vec::with_capacity(values.len());

    for value in values {
        if let Value::Term {
            text,
            kind: TermKind::Bare,
        } = &value
        {
            if let Some(Value::Term {
                text: prev,
                kind: TermKind::Bare | TermKind::Counted,
            }) = merged.last_mut()
            {
                prev.push(' ');
                prev.push_str(text);
                continue;
            }
        }
        merged.push(value);
    }

    merged
}

/// Cartesian product of one OR-branch against its nested groups.
fn fold_branch(branch: &[Value]) -> Result<TermGroups, QueryError> {
    let mut product: TermGroups = vec![Vec::new()];

    for value in branch {
        match value {
            Value::Term { text, .. } => {
                for group in &mut product {
                    group.push(text.clone());
                }
            }
            Value::Group(alternatives) if !alternatives.is_empty() => {
                if product.len().saturating_mul(alternatives.len()) > MAX_ALTERNATIVES {
                    return Err(too_many_alternatives());
                }
                product = product
                    .iter()
                    .flat_map(|prefix| {
                        alternatives.iter().map(move |alt| {
                            let mut group = prefix.clone();
                            group.extend(alt.iter().cloned());
                            group
                        })
                    })
                    .collect();
            }
            _ => {}
        }
    }

    Ok(product)
}

fn too_many_alternatives() -> QueryError {
    QueryError::Syntax(format!(
        "query expands to more than {} alternatives",
        MAX_ALTERNATIVES
    ))
}

fn normalize(groups: TermGroups) -> TermGroups {
    let mut groups: TermGroups = groups
        .into_iter()
        .map(|mut g| {
            g.sort();
            g.dedup();
            g
        })
        .collect();

    groups.sort_by_key(|g| g.join(" "));
    groups.dedup();

    if groups.len() > 1 {
        groups.retain(|g| !g.is_empty());
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn grammar() -> QueryGrammar {
        QueryGrammar::new(AliasTable::from_pairs([
            ("warded", vec![vec!["lw"], vec!["bw"]]),
            ("no luck", vec![vec!["randomhitchance false"]]),
        ]))
    }

    fn groups(raw: &[&[&str]]) -> TermGroups {
        raw.iter()
            .map(|g| g.iter().map(|t| t.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_and_is_redundant() {
        let g = grammar();
        assert_eq!(g.parse("knight and scout").unwrap(), groups(&[&["knight", "scout"]]));
        assert_eq!(g.parse("scout AND knight").unwrap(), groups(&[&["knight", "scout"]]));
    }

    #[test]
    fn test_adjacent_words_form_compound() {
        let g = grammar();
        assert_eq!(g.parse("iron fist").unwrap(), groups(&[&["iron fist"]]));
        assert_eq!(g.parse("knight scout").unwrap(), groups(&[&["knight scout"]]));
    }

    #[test]
    fn test_or_splits_branches() {
        let g = grammar();
        assert_eq!(
            g.parse("knight or scout").unwrap(),
            groups(&[&["knight"], &["scout"]])
        );
    }

    #[test]
    fn test_scenario_double_knight_or_no_luck() {
        let parsed = grammar().parse("double knight or no luck").unwrap();
        assert_eq!(
            parsed,
            groups(&[&["2 knight"], &["randomhitchance false"]])
        );
    }

    #[test]
    fn test_counted_term_starts_compound() {
        let g = grammar();
        assert_eq!(
            g.parse("iron fist 3 knight").unwrap(),
            groups(&[&["3 knight", "iron fist"]])
        );
        assert_eq!(g.parse("3 iron fist").unwrap(), groups(&[&["3 iron fist"]]));
    }

    #[test]
    fn test_quoted_phrase_is_sealed() {
        let g = grammar();
        assert_eq!(
            g.parse(r#"knight "iron fist" scout"#).unwrap(),
            groups(&[&["iron fist", "knight", "scout"]])
        );
    }

    #[test]
    fn test_parenthetical_product() {
        let g = grammar();
        assert_eq!(
            g.parse("knight and (scout or mage)").unwrap(),
            groups(&[&["knight", "mage"], &["knight", "scout"]])
        );
    }

    #[test]
    fn test_alias_expands_to_or_group() {
        let g = grammar();
        assert_eq!(
            g.parse("warded knight").unwrap(),
            groups(&[&["bw", "knight"], &["knight", "lw"]])
        );
    }

    #[test]
    fn test_duplicate_branches_collapse() {
        let g = grammar();
        assert_eq!(
            g.parse("knight or knight or (knight)").unwrap(),
            groups(&[&["knight"]])
        );
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let g = grammar();
        assert_eq!(g.parse("").unwrap(), vec![Vec::<String>::new()]);
        assert_eq!(g.parse("  and ").unwrap(), vec![Vec::<String>::new()]);
    }

    #[test]
    fn test_unbalanced_parens() {
        let g = grammar();
        assert!(matches!(g.parse("(knight"), Err(QueryError::Syntax(_))));
        assert!(matches!(g.parse("knight)"), Err(QueryError::Syntax(_))));
    }

    #[test]
    fn test_dangling_count() {
        let g = grammar();
        assert!(matches!(g.parse("knight 3"), Err(QueryError::Syntax(_))));
        assert!(matches!(g.parse("double or knight"), Err(QueryError::Syntax(_))));
        assert!(matches!(g.parse("2 warded"), Err(QueryError::Syntax(_))));
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let depth = 200_000;
        let text = format!("{}knight{}", "(".repeat(depth), ")".repeat(depth));
        assert!(matches!(grammar().parse(&text), Err(QueryError::Syntax(_))));

        let text = format!("{}knight{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert_eq!(grammar().parse(&text).unwrap(), groups(&[&["knight"]]));
    }

    #[test]
    fn test_alternative_explosion_is_rejected() {
        let g = grammar();
        let pairs: Vec<String> = (0..9).map(|i| format!("(a{i} or b{i})")).collect();
        let err = g.parse(&pairs.join(" ")).unwrap_err();
        assert!(matches!(err, QueryError::Syntax(_)));
        assert_eq!(err.status_code(), 412);

        let parsed = g.parse(&pairs[..3].join(" ")).unwrap();
        assert_eq!(parsed.len(), 8);
    }

    #[test]
    fn test_count_word_opening_keyword_is_kept() {
        let mut g = grammar();
        g.add_keyword("single file");
        g.add_keyword("triple");
        assert_eq!(g.parse("single file").unwrap(), groups(&[&["single file"]]));
        assert_eq!(
            g.parse("knight and single file").unwrap(),
            groups(&[&["knight", "single file"]])
        );
        assert_eq!(g.parse("triple").unwrap(), groups(&[&["triple"]]));
        // not followed by the rest of a keyword, so still a count
        assert_eq!(g.parse("single knight").unwrap(), groups(&[&["1 knight"]]));
    }

    #[test]
    fn test_nested_groups() {
        let g = grammar();
        assert_eq!(
            g.parse("(knight or (scout and mage)) and archer").unwrap(),
            groups(&[&["archer", "knight"], &["archer", "mage", "scout"]])
        );
    }
}
