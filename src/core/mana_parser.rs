//! Mana cost parser
//!
//! Accepts both the braced symbol form used on modern cards
//! (`{2}{W}{U/B}{G/P}{2/R}{X}{C}`) and the compact form used in card data
//! files (`2RR`, `X R`). Symbols may be mixed and separated by whitespace.

use crate::core::Color;
use crate::{MtgError, Result};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit1, multispace0, one_of},
    combinator::{all_consuming, map, map_opt, map_res, value},
    multi::many0,
    sequence::{delimited, preceded, separated_pair, terminated},
    IResult,
};

/// A single mana symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManaSymbol {
    Generic(u32),
    Colored(Color),
    /// `{W/U}`: either color
    Hybrid(Color, Color),
    /// `{2/W}`: the color or two generic
    MonoHybrid(Color),
    /// `{W/P}`: the color or 2 life
    Phyrexian(Color),
    X,
}

fn color(input: &str) -> IResult<&str, Color> {
    map_opt(one_of("WUBRG"), Color::from_char)(input)
}

fn any_color(input: &str) -> IResult<&str, Color> {
    alt((color, value(Color::Colorless, char('C'))))(input)
}

fn number(input: &str) -> IResult<&str, u32> {
    map_res(digit1, str::parse)(input)
}

fn braced_inner(input: &str) -> IResult<&str, ManaSymbol> {
    alt((
        map(terminated(color, tag("/P")), ManaSymbol::Phyrexian),
        map(separated_pair(color, char('/'), color), |(a, b)| {
            ManaSymbol::Hybrid(a, b)
        }),
        map(preceded(tag("2/"), color), ManaSymbol::MonoHybrid),
        map(number, ManaSymbol::Generic),
        value(ManaSymbol::X, char('X')),
        map(any_color, ManaSymbol::Colored),
    ))(input)
}

fn braced(input: &str) -> IResult<&str, ManaSymbol> {
    delimited(char('{'), braced_inner, char('}'))(input)
}

fn compact(input: &str) -> IResult<&str, ManaSymbol> {
    alt((
        map(number, ManaSymbol::Generic),
        value(ManaSymbol::X, char('X')),
        map(any_color, ManaSymbol::Colored),
    ))(input)
}

fn symbol(input: &str) -> IResult<&str, ManaSymbol> {
    preceded(multispace0, alt((braced, compact)))(input)
}

/// Parse a cost string into its symbols
pub fn parse_mana_symbols(input: &str) -> Result<Vec<ManaSymbol>> {
    let normalized = input.to_ascii_uppercase();
    let parsed = all_consuming(terminated(many0(symbol), multispace0))(normalized.as_str());
    match parsed {
        Ok((_, symbols)) => Ok(symbols),
        Err(e) => Err(MtgError::ParseError(format!(
            "invalid mana cost '{input}': {e}"
        ))),
    }
}
