use super::*;

fn assert_span_eq(span: Span, expected_left: (usize, usize), expected_right: (usize, usize)) {
    assert_eq!(span.start.line, expected_left.0);
    assert_eq!(span.start.column, expected_left.1);
    assert_eq!(span.end.line, expected_right.0);
    assert_eq!(span.end.column, expected_right.1);
}

fn lex_kinds(source: &str) -> Vec<TokenKind> {
    Lexer::new(source)
        .tokenize()
        .map(|t| t.expect("Failed to tokenize").kind)
        .collect()
}

#[test]
fn test_lex_identifier() {
    let mut lexer = Lexer::new("foo");
    let token = lexer.next_token().unwrap();

    assert_eq!(token.kind, TokenKind::Ident("foo".to_string()));
    assert_span_eq(token.span, (1, 1), (1, 4));
}

#[test]
fn test_lex_keywords() {
    assert_eq!(
        lex_kinds("var fun extern vtx"),
        vec![
            TokenKind::KwVar,
            TokenKind::KwFun,
            TokenKind::KwExtern,
            TokenKind::Ident("vtx".to_string()),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_lex_numbers() {
    assert_eq!(
        lex_kinds("42 3.5 7."),
        vec![
            TokenKind::IntLit(42),
            TokenKind::FloatLit(3.5),
            TokenKind::FloatLit(7.0),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_lex_invalid_number() {
    let mut lexer = Lexer::new("12abc");
    let err = lexer.next_token().unwrap_err();
    assert!(matches!(err.kind(), LexErrorKind::InvalidNumber(text) if text == "12abc"));
}

#[test]
fn test_lex_quote_openers() {
    assert_eq!(
        lex_kinds("< vertex< fragment< > vertex <"),
        vec![
            TokenKind::QuoteOpen,
            TokenKind::VertexQuoteOpen,
            TokenKind::FragmentQuoteOpen,
            TokenKind::QuoteClose,
            TokenKind::Ident("vertex".to_string()),
            TokenKind::QuoteOpen,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_lex_escapes() {
    assert_eq!(
        lex_kinds("[x] %[y]"),
        vec![
            TokenKind::LBracket,
            TokenKind::Ident("x".to_string()),
            TokenKind::RBracket,
            TokenKind::PersistOpen,
            TokenKind::Ident("y".to_string()),
            TokenKind::RBracket,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_lex_operators() {
    assert_eq!(
        lex_kinds("+ - * / ! = += -= *= /= ->"),
        vec![
            TokenKind::Plus,
            TokenKind::Minus,
            TokenKind::Star,
            TokenKind::Slash,
            TokenKind::Bang,
            TokenKind::Equals,
            TokenKind::PlusEquals,
            TokenKind::MinusEquals,
            TokenKind::StarEquals,
            TokenKind::SlashEquals,
            TokenKind::Arrow,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_lex_string_escapes() {
    let mut lexer = Lexer::new(r#""a\n\"b\"""#);
    let token = lexer.next_token().unwrap();
    assert_eq!(token.kind, TokenKind::StringLit("a\n\"b\"".to_string()));
}

#[test]
fn test_lex_unterminated_string() {
    let mut lexer = Lexer::new("\"abc");
    let err = lexer.next_token().unwrap_err();
    assert!(matches!(err.kind(), LexErrorKind::UnterminatedString));
}

#[test]
fn test_lex_comments_and_positions() {
    let mut lexer = Lexer::new("# leading comment\n  var x # trailing\n= 1");

    let var = lexer.next_token().unwrap();
    assert_eq!(var.kind, TokenKind::KwVar);
    assert_span_eq(var.span, (2, 3), (2, 6));

    let x = lexer.next_token().unwrap();
    assert_span_eq(x.span, (2, 7), (2, 8));

    let eq = lexer.next_token().unwrap();
    assert_eq!(eq.kind, TokenKind::Equals);
    assert_span_eq(eq.span, (3, 1), (3, 2));
}

#[test]
fn test_lex_unexpected_character() {
    let mut lexer = Lexer::new("var a = @;");
    for _ in 0..3 {
        lexer.next_token().unwrap();
    }
    let err = lexer.next_token().unwrap_err();
    assert!(matches!(err.kind(), LexErrorKind::UnexpectedCharacter('@')));
    assert_span_eq(err.span(), (1, 9), (1, 10));
}

#[test]
fn test_tokenize_stops_after_error() {
    let results: Vec<_> = Lexer::new("1 @ 2").tokenize().collect();
    assert_eq!(results.len(), 2);
    assert!(results[1].is_err());
}

#[test]
fn test_token_display() {
    let shown: Vec<String> = lex_kinds("var x = %[y] + 1.5; vertex<")
        .iter()
        .map(|kind| kind.to_string())
        .collect();
    assert_eq!(
        shown,
        vec![
            "var",
            "Ident(x)",
            "=",
            "%[",
            "Ident(y)",
            "]",
            "+",
            "FloatLit(1.5)",
            ";",
            "vertex<",
            "EOF",
        ]
    );
}
