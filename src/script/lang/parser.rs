use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, multispace0, satisfy},
    combinator::{all_consuming, map, map_res, not, opt, recognize},
    multi::{many0, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use super::ast::{BinaryOp, Expr, FunctionDef, Program, Statement, UnaryOp};
use crate::value::{Value, ValueType};

/// Entry point for script sources: `;`-separated statements, the last one
/// yielding the result.
pub fn parse_program(input: &str) -> IResult<&str, Program> {
    map(
        all_consuming(terminated(
            separated_list1(ws(char(';')), parse_statement),
            opt(ws(char(';'))),
        )),
        |statements| Program { statements },
    )(input)
}

/// Entry point for partition libraries: a sequence of `def` declarations.
pub fn parse_library(input: &str) -> IResult<&str, Vec<FunctionDef>> {
    all_consuming(terminated(many0(parse_function_def), multispace0))(input)
}

fn parse_function_def(input: &str) -> IResult<&str, FunctionDef> {
    map(
        tuple((
            ws(keyword("def")),
            ws(identifier),
            delimited(
                ws(char('(')),
                separated_list0(ws(char(',')), ws(identifier)),
                ws(char(')')),
            ),
            ws(char('=')),
            parse_expression,
            opt(ws(char(';'))),
        )),
        |(_, name, params, _, body, _)| FunctionDef {
            name: name.to_string(),
            params: params.into_iter().map(String::from).collect(),
            body,
        },
    )(input)
}

fn parse_statement(input: &str) -> IResult<&str, Statement> {
    alt((parse_let, map(parse_expression, Statement::Expr)))(input)
}

fn parse_let(input: &str) -> IResult<&str, Statement> {
    map(
        tuple((
            ws(keyword("let")),
            ws(identifier),
            ws(char('=')),
            parse_expression,
        )),
        |(_, name, _, value)| Statement::Let(name.to_string(), value),
    )(input)
}

pub fn parse_expression(input: &str) -> IResult<&str, Expr> {
    parse_conditional(input)
}

// 三項演算子 (c ? a : b)
fn parse_conditional(input: &str) -> IResult<&str, Expr> {
    let (input, condition) = parse_logical_or(input)?;
    let (input, branches) = opt(pair(
        preceded(ws(char('?')), parse_expression),
        preceded(ws(char(':')), parse_expression),
    ))(input)?;

    match branches {
        Some((then, otherwise)) => Ok((
            input,
            Expr::Conditional {
                condition: Box::new(condition),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
        )),
        None => Ok((input, condition)),
    }
}

// 論理OR (||)
fn parse_logical_or(input: &str) -> IResult<&str, Expr> {
    let (input, first) = parse_logical_and(input)?;
    let (input, rest) = many0(preceded(ws(tag("||")), parse_logical_and))(input)?;

    Ok((input, fold_binary(first, BinaryOp::Or, rest)))
}

// 論理AND (&&)
fn parse_logical_and(input: &str) -> IResult<&str, Expr> {
    let (input, first) = parse_comparison(input)?;
    let (input, rest) = many0(preceded(ws(tag("&&")), parse_comparison))(input)?;

    Ok((input, fold_binary(first, BinaryOp::And, rest)))
}

fn fold_binary(first: Expr, op: BinaryOp, rest: Vec<Expr>) -> Expr {
    rest.into_iter()
        .fold(first, |left, right| Expr::Binary(op, Box::new(left), Box::new(right)))
}

// 比較演算子 (==, !=, <, >, <=, >=)
fn parse_comparison(input: &str) -> IResult<&str, Expr> {
    let (input, first) = parse_additive(input)?;
    let (input, rest) = opt(tuple((
        ws(alt((
            tag("=="),
            tag("!="),
            tag("<="),
            tag(">="),
            tag("<"),
            tag(">"),
        ))),
        parse_additive,
    )))(input)?;

    match rest {
        Some((op, right)) => {
            let op = match op {
                "==" => BinaryOp::Equal,
                "!=" => BinaryOp::NotEqual,
                "<" => BinaryOp::LessThan,
                ">" => BinaryOp::GreaterThan,
                "<=" => BinaryOp::LessThanEqual,
                _ => BinaryOp::GreaterThanEqual,
            };
            Ok((input, Expr::Binary(op, Box::new(first), Box::new(right))))
        }
        None => Ok((input, first)),
    }
}

// 加減算 (+, -)
fn parse_additive(input: &str) -> IResult<&str, Expr> {
    let (input, first) = parse_multiplicative(input)?;
    let (input, rest) = many0(pair(
        ws(alt((char('+'), char('-')))),
        parse_multiplicative,
    ))(input)?;

    let result = rest.into_iter().fold(first, |left, (op, right)| {
        let op = if op == '+' {
            BinaryOp::Add
        } else {
            BinaryOp::Subtract
        };
        Expr::Binary(op, Box::new(left), Box::new(right))
    });
    Ok((input, result))
}

// 乗除算 (*, /, %)
fn parse_multiplicative(input: &str) -> IResult<&str, Expr> {
    let (input, first) = parse_unary(input)?;
    let (input, rest) = many0(pair(
        ws(alt((char('*'), char('/'), char('%')))),
        parse_unary,
    ))(input)?;

    let result = rest.into_iter().fold(first, |left, (op, right)| {
        let op = match op {
            '*' => BinaryOp::Multiply,
            '/' => BinaryOp::Divide,
            _ => BinaryOp::Remainder,
        };
        Expr::Binary(op, Box::new(left), Box::new(right))
    });
    Ok((input, result))
}

fn parse_unary(input: &str) -> IResult<&str, Expr> {
    alt((
        map(preceded(ws(char('!')), parse_unary), |operand| {
            Expr::Unary(UnaryOp::Not, Box::new(operand))
        }),
        map(preceded(ws(char('-')), parse_unary), |operand| {
            Expr::Unary(UnaryOp::Negate, Box::new(operand))
        }),
        parse_cast,
    ))(input)
}

// 型変換 (value as Type)
fn parse_cast(input: &str) -> IResult<&str, Expr> {
    let (input, value) = parse_postfix(input)?;
    let (input, casts) = many0(preceded(ws(keyword("as")), ws(parse_type_name)))(input)?;

    let result = casts
        .into_iter()
        .fold(value, |value, target| Expr::Cast(Box::new(value), target));
    Ok((input, result))
}

fn parse_type_name(input: &str) -> IResult<&str, ValueType> {
    map_res(identifier, |name: &str| name.parse::<ValueType>())(input)
}

// プロパティアクセス (a.b.c)
fn parse_postfix(input: &str) -> IResult<&str, Expr> {
    let (input, target) = parse_primary(input)?;
    let (input, properties) = many0(preceded(char('.'), identifier))(input)?;

    let result = properties.into_iter().fold(target, |target, property| {
        Expr::Property(Box::new(target), property.to_string())
    });
    Ok((input, result))
}

// 基本式
fn parse_primary(input: &str) -> IResult<&str, Expr> {
    ws(alt((
        map(parse_literal, Expr::Literal),
        map(
            delimited(
                char('['),
                separated_list0(ws(char(',')), parse_expression),
                ws(char(']')),
            ),
            Expr::List,
        ),
        // 関数呼び出し
        map(
            pair(
                identifier,
                delimited(
                    ws(char('(')),
                    separated_list0(ws(char(',')), parse_expression),
                    ws(char(')')),
                ),
            ),
            |(function, arguments)| Expr::Call(function.to_string(), arguments),
        ),
        delimited(char('('), parse_expression, ws(char(')'))),
        map(identifier, |name| Expr::Variable(name.to_string())),
    )))(input)
}

fn parse_literal(input: &str) -> IResult<&str, Value> {
    alt((
        map(parse_f64_strict, Value::Double),
        parse_integer,
        map(parse_string, Value::String),
        map(keyword("true"), |_| Value::Boolean(true)),
        map(keyword("false"), |_| Value::Boolean(false)),
        map(keyword("null"), |_| Value::Null),
    ))(input)
}

fn parse_integer(input: &str) -> IResult<&str, Value> {
    map_res(
        pair(digit1, opt(char('L'))),
        |(digits, suffix): (&str, Option<char>)| {
            if suffix.is_some() {
                return digits.parse::<i64>().map(Value::Long);
            }
            match digits.parse::<i32>() {
                Ok(value) => Ok(Value::Integer(value)),
                Err(_) => digits.parse::<i64>().map(Value::Long),
            }
        },
    )(input)
}

fn parse_f64_strict(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(tuple((
            take_while1(|c: char| c.is_ascii_digit()),
            char('.'),
            take_while1(|c: char| c.is_ascii_digit()),
        ))),
        |s: &str| s.parse::<f64>(),
    )(input)
}

fn parse_string(input: &str) -> IResult<&str, String> {
    map(
        alt((
            delimited(char('"'), take_while(|c| c != '"'), char('"')),
            delimited(char('\''), take_while(|c| c != '\''), char('\'')),
        )),
        |s: &str| s.to_string(),
    )(input)
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(is_identifier_char),
    ))(input)
}

/// A reserved word not followed by further identifier characters.
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag(word), not(satisfy(is_identifier_char)))
}

/// 空白文字のスキップ
fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}
