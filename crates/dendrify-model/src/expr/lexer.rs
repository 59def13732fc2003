// Copyright 2025 Dendrify Developers
// SPDX-License-Identifier: Apache-2.0

//! Tokenizer for the equation language
//!
//! Newlines and `;` are statement separators; other whitespace is skipped.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit0, digit1, one_of},
    combinator::{map, map_res, opt, recognize},
    sequence::{pair, tuple},
    IResult,
};

use crate::error::{ModelError, ModelResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Ident(String),
    True,
    False,
    And,
    Or,
    Not,
    Plus,
    Minus,
    Star,
    Slash,
    Power,
    LParen,
    RParen,
    Comma,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    Separator,
}

pub fn tokenize(source: &str) -> ModelResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut remaining = source;

    while !remaining.is_empty() {
        if let Ok((rest, _)) = take_while1::<_, _, nom::error::Error<_>>(|c: char| c == ' ' || c == '\t' || c == '\r')(remaining) {
            remaining = rest;
            continue;
        }

        match parse_token(remaining) {
            Ok((rest, token)) => {
                tokens.push(token);
                remaining = rest;
            }
            Err(_) => {
                return Err(ModelError::InvalidEquation {
                    source_text: source.to_string(),
                    reason: format!("unexpected character '{}'", remaining.chars().next().unwrap_or_default()),
                });
            }
        }
    }
    Ok(tokens)
}

fn parse_token(input: &str) -> IResult<&str, Token> {
    alt((parse_number, parse_word, parse_operator, parse_delimiter))(input)
}

fn parse_number(input: &str) -> IResult<&str, Token> {
    map(
        map_res(
            recognize(pair(
                alt((
                    recognize(pair(digit1, opt(pair(char('.'), digit0)))),
                    recognize(pair(char('.'), digit1)),
                )),
                opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
            )),
            |text: &str| text.parse::<f64>(),
        ),
        Token::Number,
    )(input)
}

/// Identifiers and the word-like keywords
fn parse_word(input: &str) -> IResult<&str, Token> {
    map(
        recognize(pair(
            take_while1(|c: char| c.is_alphabetic() || c == '_'),
            take_while(|c: char| c.is_alphanumeric() || c == '_'),
        )),
        |word: &str| match word {
            "True" | "true" => Token::True,
            "False" | "false" => Token::False,
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            _ => Token::Ident(word.to_string()),
        },
    )(input)
}

fn parse_operator(input: &str) -> IResult<&str, Token> {
    alt((
        map(tag("**"), |_| Token::Power),
        map(tag("+="), |_| Token::PlusAssign),
        map(tag("-="), |_| Token::MinusAssign),
        map(tag("*="), |_| Token::StarAssign),
        map(tag("/="), |_| Token::SlashAssign),
        map(tag("<="), |_| Token::Le),
        map(tag(">="), |_| Token::Ge),
        map(tag("=="), |_| Token::EqEq),
        map(tag("!="), |_| Token::NotEq),
        map(tag("&&"), |_| Token::And),
        map(tag("||"), |_| Token::Or),
        map(char('+'), |_| Token::Plus),
        map(char('-'), |_| Token::Minus),
        map(char('*'), |_| Token::Star),
        map(char('/'), |_| Token::Slash),
        map(char('^'), |_| Token::Power),
        map(char('<'), |_| Token::Lt),
        map(char('>'), |_| Token::Gt),
        map(char('='), |_| Token::Assign),
    ))(input)
}

fn parse_delimiter(input: &str) -> IResult<&str, Token> {
    alt((
        map(char('('), |_| Token::LParen),
        map(char(')'), |_| Token::RParen),
        map(char(','), |_| Token::Comma),
        map(one_of("\n;"), |_| Token::Separator),
    ))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_arithmetic() {
        let tokens = tokenize("g_L*(E_L - V)/1.5e-3").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("g_L".into()),
                Token::Star,
                Token::LParen,
                Token::Ident("E_L".into()),
                Token::Minus,
                Token::Ident("V".into()),
                Token::RParen,
                Token::Slash,
                Token::Number(1.5e-3),
            ]
        );
    }

    #[test]
    fn test_tokenize_statements() {
        let tokens = tokenize("V = V_reset; w += b").unwrap();
        assert_eq!(tokens[1], Token::Assign);
        assert_eq!(tokens[3], Token::Separator);
        assert_eq!(tokens[5], Token::PlusAssign);
    }

    #[test]
    fn test_tokenize_rejects_garbage() {
        assert_eq!(
            tokenize("V $ 3"),
            Err(ModelError::InvalidEquation {
                source_text: "V $ 3".into(),
                reason: "unexpected character '$'".into()
            })
        );
    }

    #[test]
    fn test_tokenize_keywords_and_operators() {
        let tokens = tokenize("not (x >= .5e1) and android**2 != 1 || True\ny").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Not,
                Token::LParen,
                Token::Ident("x".into()),
                Token::Ge,
                Token::Number(5.0),
                Token::RParen,
                Token::And,
                Token::Ident("android".into()),
                Token::Power,
                Token::Number(2.0),
                Token::NotEq,
                Token::Number(1.0),
                Token::Or,
                Token::True,
                Token::Separator,
                Token::Ident("y".into()),
            ]
        );
    }
}
