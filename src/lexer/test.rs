use super::*;
use logos::Logos;

#[test]
fn test_basic_tokens() {
    let input = "
    file \"main.kt\"
    fun id(x: Int): Int { return get x }
    ";
    let mut lexer = Token::lexer(input);

    assert_eq!(lexer.next(), Some(Ok(Token::KeywordFile)));
    assert_eq!(lexer.next(), Some(Ok(Token::String("main.kt".to_string()))));
    assert_eq!(lexer.next(), Some(Ok(Token::KeywordFun)));
    assert_eq!(lexer.next(), Some(Ok(Token::Ident("id".to_string()))));
    assert_eq!(lexer.next(), Some(Ok(Token::LParen)));
    assert_eq!(lexer.next(), Some(Ok(Token::Ident("x".to_string()))));
    assert_eq!(lexer.next(), Some(Ok(Token::Colon)));
    assert_eq!(lexer.next(), Some(Ok(Token::Ident("Int".to_string()))));
    assert_eq!(lexer.next(), Some(Ok(Token::RParen)));
    assert_eq!(lexer.next(), Some(Ok(Token::Colon)));
    assert_eq!(lexer.next(), Some(Ok(Token::Ident("Int".to_string()))));
    assert_eq!(lexer.next(), Some(Ok(Token::LBrace)));
    assert_eq!(lexer.next(), Some(Ok(Token::KeywordReturn)));
    assert_eq!(lexer.next(), Some(Ok(Token::KeywordGet)));
    assert_eq!(lexer.next(), Some(Ok(Token::Ident("x".to_string()))));
    assert_eq!(lexer.next(), Some(Ok(Token::RBrace)));
    assert_eq!(lexer.next(), None);
}

#[test]
fn test_numeric_literals() {
    let mut lexer = Token::lexer("42 -7 9000000000L 2.5 'c' true null");

    assert_eq!(lexer.next(), Some(Ok(Token::Int(42))));
    assert_eq!(lexer.next(), Some(Ok(Token::Int(-7))));
    assert_eq!(lexer.next(), Some(Ok(Token::Long(9_000_000_000))));
    assert_eq!(lexer.next(), Some(Ok(Token::Double(2.5))));
    assert_eq!(lexer.next(), Some(Ok(Token::Char('c'))));
    assert_eq!(lexer.next(), Some(Ok(Token::Bool(true))));
    assert_eq!(lexer.next(), Some(Ok(Token::KeywordNull)));
}

#[test]
fn test_comments_are_skipped() {
    let mut lexer = Token::lexer("val // not a token\nx");

    assert_eq!(lexer.next(), Some(Ok(Token::KeywordVal)));
    assert_eq!(lexer.next(), Some(Ok(Token::Ident("x".to_string()))));
    assert_eq!(lexer.next(), None);
}

#[test]
fn test_keywords_are_not_identifiers() {
    let mut lexer = Token::lexer("getter get");

    assert_eq!(lexer.next(), Some(Ok(Token::Ident("getter".to_string()))));
    assert_eq!(lexer.next(), Some(Ok(Token::KeywordGet)));
}

#[test]
fn test_error_recovery() {
    let mut lexer = Token::lexer("val @ x");

    assert_eq!(lexer.next(), Some(Ok(Token::KeywordVal)));
    assert!(lexer.next().unwrap().is_err()); // Invalid token '@'
    assert_eq!(lexer.next(), Some(Ok(Token::Ident("x".to_string()))));
}

#[test]
fn test_int_overflow_is_an_error() {
    let mut lexer = Token::lexer("99999999999");
    assert!(lexer.next().unwrap().is_err());
}

#[test]
fn test_string_escapes() {
    let mut lexer = Token::lexer(r#""tab\there" "a\\n\"q" "odd\x""#);

    assert_eq!(lexer.next(), Some(Ok(Token::String("tab\there".to_string()))));
    // an escaped backslash does not start a new escape
    assert_eq!(lexer.next(), Some(Ok(Token::String("a\\n\"q".to_string()))));
    assert_eq!(lexer.next(), Some(Ok(Token::String("odd\\x".to_string()))));
    assert_eq!(lexer.next(), None);
}
