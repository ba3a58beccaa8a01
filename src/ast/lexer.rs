// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Lexer for the query language, built from nom combinators.
//!
//! Multi-character symbols must be tried before their single-character
//! prefixes and every token function either consumes input or fails, so
//! the tokenize loop always advances.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1},
    combinator::{map, opt, recognize},
    sequence::{delimited, pair, preceded},
    IResult,
};

/// Token stream alphabet.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Match,
    Where,
    Return,
    Create,
    Distinct,
    Order,
    By,
    Asc,
    Desc,
    Skip,
    Limit,
    And,
    Or,
    Not,
    Xor,
    Null,
    True,
    False,
    In,
    Starts,
    Ends,
    With,
    Contains,
    As,

    // Literals and names
    Identifier(String),
    Parameter(String),
    Integer(i64),
    Float(f64),
    StringLit(String),

    // Symbols
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Colon,
    Comma,
    Dot,
    Plus,
    Dash,
    Star,
    Slash,
    Percent,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Arrow,
    ArrowLeft,
    Pipe,

    Eof,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn identifier_text(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(is_ident_start),
        take_while(is_ident_continue),
    ))(input)
}

/// Identifiers double as keywords; keywords are case-insensitive.
fn word(input: &str) -> IResult<&str, Token> {
    let (rest, text) = identifier_text(input)?;
    let token = match text.to_ascii_uppercase().as_str() {
        "MATCH" => Token::Match,
        "WHERE" => Token::Where,
        "RETURN" => Token::Return,
        "CREATE" => Token::Create,
        "DISTINCT" => Token::Distinct,
        "ORDER" => Token::Order,
        "BY" => Token::By,
        "ASC" | "ASCENDING" => Token::Asc,
        "DESC" | "DESCENDING" => Token::Desc,
        "SKIP" => Token::Skip,
        "LIMIT" => Token::Limit,
        "AND" => Token::And,
        "OR" => Token::Or,
        "NOT" => Token::Not,
        "XOR" => Token::Xor,
        "NULL" => Token::Null,
        "TRUE" => Token::True,
        "FALSE" => Token::False,
        "IN" => Token::In,
        "STARTS" => Token::Starts,
        "ENDS" => Token::Ends,
        "WITH" => Token::With,
        "CONTAINS" => Token::Contains,
        "AS" => Token::As,
        _ => Token::Identifier(text.to_string()),
    };
    Ok((rest, token))
}

fn parameter(input: &str) -> IResult<&str, Token> {
    map(preceded(char('$'), identifier_text), |name: &str| {
        Token::Parameter(name.to_string())
    })(input)
}

fn number(input: &str) -> IResult<&str, Token> {
    let (rest, text) = recognize(pair(digit1, opt(pair(char('.'), digit1))))(input)?;
    let token = if text.contains('.') {
        match text.parse::<f64>() {
            Ok(f) => Token::Float(f),
            Err(_) => {
                return Err(nom::Err::Error(nom::error::Error::new(
                    input,
                    nom::error::ErrorKind::Float,
                )))
            }
        }
    } else {
        match text.parse::<i64>() {
            Ok(i) => Token::Integer(i),
            Err(_) => {
                return Err(nom::Err::Error(nom::error::Error::new(
                    input,
                    nom::error::ErrorKind::Digit,
                )))
            }
        }
    };
    Ok((rest, token))
}

fn string_literal(input: &str) -> IResult<&str, Token> {
    map(
        alt((
            delimited(char('\''), take_while(|c| c != '\''), char('\'')),
            delimited(char('"'), take_while(|c| c != '"'), char('"')),
        )),
        |text: &str| Token::StringLit(text.to_string()),
    )(input)
}

fn symbol(input: &str) -> IResult<&str, Token> {
    alt((
        alt((
            map(tag("<="), |_| Token::Le),
            map(tag(">="), |_| Token::Ge),
            map(tag("<>"), |_| Token::Ne),
            map(tag("<-"), |_| Token::ArrowLeft),
            map(tag("->"), |_| Token::Arrow),
            map(tag("("), |_| Token::LeftParen),
            map(tag(")"), |_| Token::RightParen),
            map(tag("["), |_| Token::LeftBracket),
            map(tag("]"), |_| Token::RightBracket),
            map(tag("{"), |_| Token::LeftBrace),
            map(tag("}"), |_| Token::RightBrace),
        )),
        alt((
            map(tag(":"), |_| Token::Colon),
            map(tag(","), |_| Token::Comma),
            map(tag("."), |_| Token::Dot),
            map(tag("+"), |_| Token::Plus),
            map(tag("-"), |_| Token::Dash),
            map(tag("*"), |_| Token::Star),
            map(tag("/"), |_| Token::Slash),
            map(tag("%"), |_| Token::Percent),
            map(tag("="), |_| Token::Eq),
            map(tag("<"), |_| Token::Lt),
            map(tag(">"), |_| Token::Gt),
            map(tag("|"), |_| Token::Pipe),
        )),
    ))(input)
}

fn token(input: &str) -> IResult<&str, Token> {
    alt((parameter, number, string_literal, word, symbol))(input)
}

fn skip_trivia(mut input: &str) -> &str {
    loop {
        let trimmed = input.trim_start();
        if let Some(rest) = trimmed.strip_prefix("//") {
            input = match rest.find('\n') {
                Some(pos) => &rest[pos + 1..],
                None => "",
            };
        } else if trimmed.len() != input.len() {
            input = trimmed;
        } else {
            return input;
        }
    }
}

/// Tokenize a query string. The result always ends with [`Token::Eof`].
pub fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut rest = skip_trivia(input);
    let mut tokens = Vec::new();
    while !rest.is_empty() {
        match token(rest) {
            Ok((next, tok)) => {
                if next.len() >= rest.len() {
                    return Err(format!("lexer made no progress at: {:.32}", rest));
                }
                tokens.push(tok);
                rest = skip_trivia(next);
            }
            Err(_) => return Err(format!("unexpected input at: {:.32}", rest)),
        }
    }
    tokens.push(Token::Eof);
    Ok(tokens)
}
