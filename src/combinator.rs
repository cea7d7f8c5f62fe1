//! String parser combinators.
//!
//! Small building blocks for the selector grammar. A parser is a pure
//! function from remaining input to either a matched value plus the rest of
//! the input, or failure. No parser has side effects and none backtracks
//! into input it has already consumed.

use std::marker::PhantomData;

use regex::Regex;

/// A successful parse yields the matched value and the remaining input.
pub type ParseResult<'a, T> = Option<(T, &'a str)>;

/// A pure prefix parser.
pub trait Parser<T> {
    fn parse<'a>(&self, input: &'a str) -> ParseResult<'a, T>;
}

/// Matches a prefix of the input against a pattern, case-insensitively.
pub struct Pattern {
    re: Regex,
}

/// Build a parser that consumes a prefix matching `pattern`.
///
/// Matching is anchored at the start of input and case-insensitive. Panics
/// if the pattern itself is invalid, which is a programming error in the
/// grammar, not an input condition.
pub fn pattern(pattern: &str) -> Pattern {
    let re = Regex::new(&format!("^(?i:{pattern})")).expect("invalid grammar pattern");
    Pattern { re }
}

impl Parser<String> for Pattern {
    fn parse<'a>(&self, input: &'a str) -> ParseResult<'a, String> {
        let m = self.re.find(input)?;
        Some((m.as_str().to_string(), &input[m.end()..]))
    }
}

/// Applies two parsers in order; both must succeed.
pub struct Pair<P1, P2> {
    first: P1,
    second: P2,
}

pub fn pair<P1, P2>(first: P1, second: P2) -> Pair<P1, P2> {
    Pair { first, second }
}

impl<T1, T2, P1, P2> Parser<(T1, T2)> for Pair<P1, P2>
where
    P1: Parser<T1>,
    P2: Parser<T2>,
{
    fn parse<'a>(&self, input: &'a str) -> ParseResult<'a, (T1, T2)> {
        let (v1, rest) = self.first.parse(input)?;
        let (v2, rest) = self.second.parse(rest)?;
        Some(((v1, v2), rest))
    }
}

/// Applies every parser in order, collecting the values.
///
/// Fails at the first failing element without backtracking into input the
/// preceding elements consumed.
pub struct Sequence<T> {
    parsers: Vec<Box<dyn Parser<T>>>,
}

pub fn sequence<T>(parsers: Vec<Box<dyn Parser<T>>>) -> Sequence<T> {
    Sequence { parsers }
}

impl<T> Parser<Vec<T>> for Sequence<T> {
    fn parse<'a>(&self, input: &'a str) -> ParseResult<'a, Vec<T>> {
        let mut values = Vec::with_capacity(self.parsers.len());
        let mut rest = input;
        for parser in &self.parsers {
            let (value, next) = parser.parse(rest)?;
            values.push(value);
            rest = next;
        }
        Some((values, rest))
    }
}

/// Tries alternatives strictly in listed order and returns the first
/// success. Ordering is significant; there is no longest-match semantics.
pub struct Choice<T> {
    options: Vec<Box<dyn Parser<T>>>,
}

pub fn choice<T>(options: Vec<Box<dyn Parser<T>>>) -> Choice<T> {
    Choice { options }
}

impl<T> Parser<T> for Choice<T> {
    fn parse<'a>(&self, input: &'a str) -> ParseResult<'a, T> {
        self.options.iter().find_map(|p| p.parse(input))
    }
}

/// Transforms a successful value; failure passes through unchanged.
///
/// The marker pins the inner parser's value type, which appears in no
/// field otherwise.
pub struct Map<T, P, F> {
    inner: P,
    f: F,
    marker: PhantomData<fn(T)>,
}

pub fn map<T, U, P, F>(inner: P, f: F) -> Map<T, P, F>
where
    P: Parser<T>,
    F: Fn(T) -> U,
{
    Map {
        inner,
        f,
        marker: PhantomData,
    }
}

impl<T, U, P, F> Parser<U> for Map<T, P, F>
where
    P: Parser<T>,
    F: Fn(T) -> U,
{
    fn parse<'a>(&self, input: &'a str) -> ParseResult<'a, U> {
        let (value, rest) = self.inner.parse(input)?;
        Some(((self.f)(value), rest))
    }
}

/// Applies a parser greedily one or more times.
///
/// Succeeds iff the first application succeeds; stops at the first failing
/// attempt and returns all prior matches.
pub struct Many1<P> {
    inner: P,
}

pub fn many1<P>(inner: P) -> Many1<P> {
    Many1 { inner }
}

impl<T, P> Parser<Vec<T>> for Many1<P>
where
    P: Parser<T>,
{
    fn parse<'a>(&self, input: &'a str) -> ParseResult<'a, Vec<T>> {
        let (first, mut rest) = self.inner.parse(input)?;
        let mut values = vec![first];
        while let Some((value, next)) = self.inner.parse(rest) {
            values.push(value);
            rest = next;
        }
        Some((values, rest))
    }
}
