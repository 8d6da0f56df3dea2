// tests/lexer_tests.rs

use targex::ast::{BinOp, Punct, TokenKind, UnaryOp};
use targex::lexer::{LexError, tokenize};

fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(source)
        .unwrap()
        .into_iter()
        .map(|token| token.kind)
        .collect()
}

fn ident(name: &str) -> TokenKind {
    TokenKind::Identifier(name.to_string())
}

// ============================================================================
// Punctuation and operators
// ============================================================================

#[test]
fn test_punctuation() {
    let test_cases = vec![
        (".", Punct::Dot),
        (",", Punct::Comma),
        ("|", Punct::Pipe),
        (":", Punct::Colon),
        ("?", Punct::Question),
        ("[", Punct::LBracket),
        ("]", Punct::RBracket),
        ("(", Punct::LParen),
        (")", Punct::RParen),
        ("{", Punct::LBrace),
        ("}", Punct::RBrace),
    ];

    for (input, expected) in test_cases {
        assert_eq!(kinds(input), vec![TokenKind::Punct(expected)], "input: {}", input);
    }
}

#[test]
fn test_binary_operators() {
    let test_cases = vec![
        ("==", BinOp::Equal),
        ("!=", BinOp::NotEqual),
        ("<", BinOp::LessThan),
        ("<=", BinOp::LessEqual),
        (">", BinOp::GreaterThan),
        (">=", BinOp::GreaterEqual),
        ("&&", BinOp::And),
        ("||", BinOp::Or),
        ("+", BinOp::Add),
        ("*", BinOp::Multiply),
        ("/", BinOp::Divide),
        ("//", BinOp::FloorDivide),
        ("%", BinOp::Modulo),
        ("^", BinOp::Power),
    ];

    for (input, expected) in test_cases {
        let source = format!("a {} b", input);
        assert_eq!(
            kinds(&source),
            vec![ident("a"), TokenKind::Binary(expected), ident("b")],
            "input: {}",
            source
        );
    }
}

#[test]
fn test_longest_match() {
    assert_eq!(
        kinds("a<=b"),
        vec![ident("a"), TokenKind::Binary(BinOp::LessEqual), ident("b")]
    );
    assert_eq!(
        kinds("a//b"),
        vec![ident("a"), TokenKind::Binary(BinOp::FloorDivide), ident("b")]
    );
    assert_eq!(
        kinds("!a"),
        vec![TokenKind::Unary(UnaryOp::Not), ident("a")]
    );
    assert_eq!(
        kinds("a!=b"),
        vec![ident("a"), TokenKind::Binary(BinOp::NotEqual), ident("b")]
    );
}

#[test]
fn test_unary_minus_at_operand_position() {
    assert_eq!(kinds("-1"), vec![TokenKind::Unary(UnaryOp::Negate), TokenKind::Integer(1)]);
    assert_eq!(
        kinds("2*-x"),
        vec![
            TokenKind::Integer(2),
            TokenKind::Binary(BinOp::Multiply),
            TokenKind::Unary(UnaryOp::Negate),
            ident("x"),
        ]
    );
    assert_eq!(
        kinds("a[0]-1"),
        vec![
            ident("a"),
            TokenKind::Punct(Punct::LBracket),
            TokenKind::Integer(0),
            TokenKind::Punct(Punct::RBracket),
            TokenKind::Binary(BinOp::Subtract),
            TokenKind::Integer(1),
        ]
    );
}

// ============================================================================
// Literals
// ============================================================================

#[test]
fn test_numbers() {
    assert_eq!(kinds("42"), vec![TokenKind::Integer(42)]);
    assert_eq!(kinds("2.75"), vec![TokenKind::Float(2.75)]);
    assert_eq!(kinds("0.5"), vec![TokenKind::Float(0.5)]);
    assert_eq!(
        kinds("99999999999999999999"),
        vec![TokenKind::Float(99999999999999999999.0)]
    );
}

#[test]
fn test_leading_dot_is_not_a_number() {
    assert_eq!(
        kinds(".5"),
        vec![TokenKind::Punct(Punct::Dot), TokenKind::Integer(5)]
    );
    // `1.` followed by a name is an attribute access, not a float
    assert_eq!(
        kinds("1.a"),
        vec![TokenKind::Integer(1), TokenKind::Punct(Punct::Dot), ident("a")]
    );
}

#[test]
fn test_strings() {
    assert_eq!(kinds(r#""hello""#), vec![TokenKind::String("hello".into())]);
    assert_eq!(kinds("'hello'"), vec![TokenKind::String("hello".into())]);
    assert_eq!(kinds(r#""it's""#), vec![TokenKind::String("it's".into())]);
    assert_eq!(kinds(r#"'say "hi"'"#), vec![TokenKind::String("say \"hi\"".into())]);
    assert_eq!(kinds(r#""a\"b""#), vec![TokenKind::String("a\"b".into())]);
    assert_eq!(kinds(r#""a\\b""#), vec![TokenKind::String("a\\b".into())]);
    assert_eq!(kinds(r#""a\nb\t""#), vec![TokenKind::String("a\nb\t".into())]);
    assert_eq!(kinds(r#""\q""#), vec![TokenKind::String("q".into())]);
    assert_eq!(kinds("''"), vec![TokenKind::String(String::new())]);
}

#[test]
fn test_keywords_and_identifiers() {
    assert_eq!(
        kinds("true false null"),
        vec![TokenKind::Boolean(true), TokenKind::Boolean(false), TokenKind::Null]
    );
    assert_eq!(
        kinds("a in b"),
        vec![ident("a"), TokenKind::Binary(BinOp::In), ident("b")]
    );
    assert_eq!(
        kinds("index truthy nullable $x _y"),
        vec![
            ident("index"),
            ident("truthy"),
            ident("nullable"),
            ident("$x"),
            ident("_y"),
        ]
    );
}

// ============================================================================
// Token metadata
// ============================================================================

#[test]
fn test_offsets() {
    let tokens = tokenize("normandy.channel == 'beta'").unwrap();
    let offsets: Vec<usize> = tokens.iter().map(|t| t.offset).collect();
    assert_eq!(offsets, vec![0, 8, 9, 17, 20]);

    let raws: Vec<&str> = tokens.iter().map(|t| t.raw.as_str()).collect();
    assert_eq!(raws, vec!["normandy", ".", "channel", "==", "'beta'"]);
}

#[test]
fn test_offsets_count_characters() {
    let tokens = tokenize("'é' == x").unwrap();
    let offsets: Vec<usize> = tokens.iter().map(|t| t.offset).collect();
    assert_eq!(offsets, vec![0, 4, 7]);

    assert_eq!(
        tokenize("'ü' # x"),
        Err(LexError::UnexpectedCharacter {
            text: "#".to_string(),
            offset: 4
        })
    );
}

#[test]
fn test_whitespace_is_skipped() {
    assert!(kinds("  \n\t ").is_empty());
    assert_eq!(
        kinds(" a\n&&\tb "),
        vec![ident("a"), TokenKind::Binary(BinOp::And), ident("b")]
    );
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unexpected_character() {
    assert_eq!(
        tokenize("a # b"),
        Err(LexError::UnexpectedCharacter {
            text: "#".to_string(),
            offset: 2
        })
    );
    // A single `&` or `=` is not an operator
    assert!(matches!(tokenize("a & b"), Err(LexError::UnexpectedCharacter { .. })));
    assert!(matches!(tokenize("a = b"), Err(LexError::UnexpectedCharacter { .. })));
}

#[test]
fn test_unterminated_string() {
    assert_eq!(
        tokenize("x == 'open"),
        Err(LexError::UnterminatedString { offset: 5 })
    );
    assert_eq!(
        tokenize(r#""trailing\"#),
        Err(LexError::UnterminatedString { offset: 0 })
    );
}
