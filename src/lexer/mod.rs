use logos::Logos;

#[cfg(test)]
pub mod test;

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \n\r\t\f]+")] // Ignore this regex pattern between tokens
#[logos(skip r"//[^\n]*")] // Line comments
#[derive(Clone)]
pub enum Token {
    #[regex(r"true|false", |lex| lex.slice() == "true")]
    Bool(bool),

    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i32>().ok())]
    Int(i32),

    #[regex(r"-?[0-9]+L", |lex| {
        let s = lex.slice();
        s[..s.len() - 1].parse::<i64>().ok()
    })]
    Long(i64),

    #[regex(r"-?[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Double(f64),

    #[regex(r#""([^"\\]*(\\.[^"\\]*)*)""#, |lex| {
        let s = lex.slice();
        unescape(&s[1..s.len() - 1])
    })]
    String(String),

    #[regex(r"'[^'\\]'", |lex| lex.slice().chars().nth(1))]
    Char(char),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex|{
        lex.slice().to_string()
    })]
    Ident(String),

    #[token("module")]
    KeywordModule,

    #[token("file")]
    KeywordFile,

    #[token("class")]
    KeywordClass,

    #[token("fun")]
    KeywordFun,

    #[token("val")]
    KeywordVal,

    #[token("var")]
    KeywordVar,

    #[token("prop")]
    KeywordProp,

    #[token("field")]
    KeywordField,

    #[token("get")]
    KeywordGet,

    #[token("set")]
    KeywordSet,

    #[token("call")]
    KeywordCall,

    #[token("return")]
    KeywordReturn,

    #[token("if")]
    KeywordIf,

    #[token("else")]
    KeywordElse,

    #[token("null")]
    KeywordNull,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token(",")]
    Comma,

    #[token(":")]
    Colon,

    #[token("?")]
    Question,

    #[token("=")]
    Assign,
}

impl Token {
    /// Tokens that can begin an expression.
    pub fn starts_expression(&self) -> bool {
        matches!(
            self,
            Token::Bool(_)
                | Token::Int(_)
                | Token::Long(_)
                | Token::Double(_)
                | Token::String(_)
                | Token::Char(_)
                | Token::KeywordNull
                | Token::KeywordGet
                | Token::KeywordSet
                | Token::KeywordCall
                | Token::KeywordReturn
                | Token::KeywordIf
                | Token::LBrace
        )
    }
}

/// Resolves `\n`, `\r`, `\t`, `\"` and `\\` in a string literal body.
/// Unknown escapes are kept as written.
fn unescape(body: &str) -> Option<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            '"' => out.push('"'),
            '\\' => out.push('\\'),
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    Some(out)
}
