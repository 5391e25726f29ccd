use std::fmt::Display;

pub const KEYWORDS: [&str; 11] = [
    "let", "if", "then", "else", "end", "while", "do", "fun", "print", "return", "import",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Number,
    String,
    Keyword,
    Identifier,
    Dot,
    Operator,
    LeftParen,
    RightParen,
    Comma,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Number => write!(f, "number"),
            TokenKind::String => write!(f, "string"),
            TokenKind::Keyword => write!(f, "keyword"),
            TokenKind::Identifier => write!(f, "identifier"),
            TokenKind::Dot => write!(f, "."),
            TokenKind::Operator => write!(f, "operator"),
            TokenKind::LeftParen => write!(f, "("),
            TokenKind::RightParen => write!(f, ")"),
            TokenKind::Comma => write!(f, ","),
        }
    }
}

/// A lexeme with its kind and byte offset into the source.
///
/// String tokens keep their lexeme without the surrounding quotes; every
/// other kind keeps the matched text verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub offset: usize,
}

impl Token {
    fn new(kind: TokenKind, lexeme: &str, offset: usize) -> Self {
        Self {
            kind,
            lexeme: lexeme.to_string(),
            offset,
        }
    }

    pub fn is_keyword(&self, word: &str) -> bool {
        self.kind == TokenKind::Keyword && self.lexeme == word
    }

    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.lexeme == op
    }
}

enum Scan {
    Emit(TokenKind, usize),
    /// Matched trivia (whitespace, newline, comment) spanning this many bytes.
    Skip(usize),
}

/// Tokenizes the whole source. Total: trivia is consumed without being
/// emitted, and a character matching no rule is skipped rather than
/// reported, so this never fails.
pub fn tokens(source: &str) -> Vec<Token> {
    let rules: &[fn(&str) -> Option<Scan>] = &[
        comment, number, string, word, dot, operator, left_paren, right_paren, comma, whitespace,
    ];

    let mut tokens = Vec::new();
    let mut offset = 0;

    while offset < source.len() {
        let rest = &source[offset..];
        match rules.iter().find_map(|rule| rule(rest)) {
            Some(Scan::Emit(kind, len)) => {
                let lexeme = match kind {
                    TokenKind::String => &rest[1..len - 1],
                    _ => &rest[..len],
                };
                tokens.push(Token::new(kind, lexeme, offset));
                offset += len;
            }
            Some(Scan::Skip(len)) => offset += len,
            None => {
                // Lenient by design: unrecognized characters are dropped.
                offset += rest.chars().next().map_or(1, char::len_utf8);
            }
        }
    }

    tokens
}

fn comment(source: &str) -> Option<Scan> {
    if !source.starts_with('#') {
        return None;
    }
    let len = source
        .chars()
        .take_while(|c| *c != '\n')
        .map(char::len_utf8)
        .sum();
    Some(Scan::Skip(len))
}

fn number(source: &str) -> Option<Scan> {
    let integer = source.chars().take_while(char::is_ascii_digit).count();
    if integer == 0 {
        return None;
    }

    let fraction = source[integer..]
        .strip_prefix('.')
        .map(|after| after.chars().take_while(char::is_ascii_digit).count())
        .unwrap_or(0);

    let len = if fraction > 0 {
        integer + 1 + fraction
    } else {
        integer
    };
    Some(Scan::Emit(TokenKind::Number, len))
}

fn string(source: &str) -> Option<Scan> {
    let rest = source.strip_prefix('"')?;
    let body: usize = rest
        .chars()
        .take_while(|c| *c != '"')
        .map(char::len_utf8)
        .sum();
    // No escape processing; an unterminated quote matches nothing and the
    // opening quote falls through to the skip rule.
    if rest[body..].starts_with('"') {
        Some(Scan::Emit(TokenKind::String, body + 2))
    } else {
        None
    }
}

/// Keywords and identifiers share one scan; an exact reserved-word match
/// wins, anything longer (e.g. `letter`) is an identifier.
fn word(source: &str) -> Option<Scan> {
    let first = source.chars().next()?;
    if !first.is_ascii_alphabetic() && first != '_' {
        return None;
    }

    let len = source
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .count();

    if KEYWORDS.contains(&&source[..len]) {
        Some(Scan::Emit(TokenKind::Keyword, len))
    } else {
        Some(Scan::Emit(TokenKind::Identifier, len))
    }
}

fn dot(source: &str) -> Option<Scan> {
    source
        .starts_with('.')
        .then_some(Scan::Emit(TokenKind::Dot, 1))
}

/// A maximal run of operator characters is one token, so `==` and `<=` lex
/// as single tokens and a malformed run like `+-` lexes as one opaque
/// operator the parser will reject.
fn operator(source: &str) -> Option<Scan> {
    let len = source
        .chars()
        .take_while(|c| "+-*/<>=!".contains(*c))
        .count();
    (len > 0).then_some(Scan::Emit(TokenKind::Operator, len))
}

fn left_paren(source: &str) -> Option<Scan> {
    source
        .starts_with('(')
        .then_some(Scan::Emit(TokenKind::LeftParen, 1))
}

fn right_paren(source: &str) -> Option<Scan> {
    source
        .starts_with(')')
        .then_some(Scan::Emit(TokenKind::RightParen, 1))
}

fn comma(source: &str) -> Option<Scan> {
    source
        .starts_with(',')
        .then_some(Scan::Emit(TokenKind::Comma, 1))
}

fn whitespace(source: &str) -> Option<Scan> {
    let len: usize = source
        .chars()
        .take_while(|c| c.is_whitespace())
        .map(char::len_utf8)
        .sum();
    (len > 0).then_some(Scan::Skip(len))
}

#[cfg(test)]
mod test {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokens(source).into_iter().map(|t| t.kind).collect()
    }

    fn lexemes(source: &str) -> Vec<String> {
        tokens(source).into_iter().map(|t| t.lexeme).collect()
    }

    #[test]
    fn test_let_statement() {
        let expected = vec![
            Token::new(TokenKind::Keyword, "let", 0),
            Token::new(TokenKind::Identifier, "x", 4),
            Token::new(TokenKind::Operator, "=", 6),
            Token::new(TokenKind::Number, "1", 8),
        ];
        assert_eq!(tokens("let x = 1"), expected);
    }

    #[test]
    fn test_comments_and_newlines_are_not_emitted() {
        let source = "let x = 1 # the answer\nprint(x)\n";
        assert_eq!(
            kinds(source),
            vec![
                TokenKind::Keyword,
                TokenKind::Identifier,
                TokenKind::Operator,
                TokenKind::Number,
                TokenKind::Keyword,
                TokenKind::LeftParen,
                TokenKind::Identifier,
                TokenKind::RightParen,
            ]
        );
    }

    #[test]
    fn test_string_lexeme_drops_quotes() {
        let toks = tokens("\"hello world\"");
        assert_eq!(toks.len(), 1);
        assert_eq!(toks[0].kind, TokenKind::String);
        assert_eq!(toks[0].lexeme, "hello world");
    }

    #[test]
    fn test_decimal_number() {
        assert_eq!(lexemes("3.14"), vec!["3.14"]);
        // A trailing dot is not part of the number.
        assert_eq!(kinds("3."), vec![TokenKind::Number, TokenKind::Dot]);
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        let toks = tokens("letter");
        assert_eq!(toks[0].kind, TokenKind::Identifier);
        assert_eq!(toks[0].lexeme, "letter");
    }

    #[test]
    fn test_operator_runs_coalesce() {
        assert_eq!(lexemes("a == b"), vec!["a", "==", "b"]);
        assert_eq!(lexemes("a >= b"), vec!["a", ">=", "b"]);
        // `1+-2` lexes the run as one opaque operator token.
        assert_eq!(lexemes("1+-2"), vec!["1", "+-", "2"]);
    }

    #[test]
    fn test_unrecognized_characters_are_skipped() {
        assert_eq!(lexemes("x @ $ y"), vec!["x", "y"]);
    }

    #[test]
    fn test_module_call_shape() {
        assert_eq!(
            kinds("math.sqrt(16)"),
            vec![
                TokenKind::Identifier,
                TokenKind::Dot,
                TokenKind::Identifier,
                TokenKind::LeftParen,
                TokenKind::Number,
                TokenKind::RightParen,
            ]
        );
    }

    #[test]
    fn test_empty_and_trivia_only_sources() {
        assert!(tokens("").is_empty());
        assert!(tokens("   \n\t # only a comment\n").is_empty());
    }
}
