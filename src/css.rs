//! Stylesheet parsing.
//!
//! Turns raw CSS text into an ordered list of [`StyleRule`]s. Tokenizing and
//! rule-splitting are delegated to cssparser; this module classifies the
//! top-level constructs, parses selectors with the crate's own grammar, and
//! reports everything it cannot represent as diagnostics instead of failing.

use cssparser::{
    AtRuleParser, CowRcStr, ParseError, Parser, ParserInput, ParserState, QualifiedRuleParser,
    RuleBodyItemParser, RuleBodyParser, StyleSheetParser, Token,
};
use serde_json::json;

use crate::diag::{Diagnostic, Outcome};
use crate::selector::{Selector, parse_selector};

/// One declaration in source order. The value is absent when the source
/// declaration was malformed but the property name was still understood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleDeclaration {
    pub property: String,
    pub value: Option<String>,
}

/// A selector plus its declarations, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRule {
    pub selector: Selector,
    pub declarations: Vec<StyleDeclaration>,
}

/// An ordered rule list. Order of appearance is semantically significant:
/// the cascade resolves conflicts purely by rule order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stylesheet {
    pub rules: Vec<StyleRule>,
}

/// Parse a CSS stylesheet.
///
/// `label` names the source (file name, `<style>` position) for diagnostic
/// attribution. Parsing never fails as a whole; unsupported constructs are
/// dropped with diagnostics and the rest of the sheet survives.
pub fn parse_css(css: &str, label: &str) -> Outcome<Stylesheet> {
    let mut rules = Vec::new();
    let mut diags = Vec::new();

    validate_leading_charset(css, label, &mut diags);

    {
        let mut input = ParserInput::new(css);
        let mut parser = Parser::new(&mut input);
        let mut rule_parser = SheetParser {
            rules: &mut rules,
            diags: &mut diags,
            label,
        };
        for result in StyleSheetParser::new(&mut parser, &mut rule_parser) {
            // Recovery is handled inside the rule parser; leftover errors
            // are constructs it already chose to skip.
            let _ = result;
        }
    }

    log::debug!("parsed {} css rules from {label}", rules.len());
    Outcome::new(Some(Stylesheet { rules }), diags)
}

/// Parse an element's inline `style` attribute text.
///
/// The text is treated as the body of a single synthetic rule with a
/// universal selector, so the cascade can append it like any other rule.
pub fn parse_inline_style(style: &str, label: &str) -> Outcome<Vec<StyleRule>> {
    log::debug!("parsing inline style from {label}");
    let mut declarations = Vec::new();

    {
        let mut input = ParserInput::new(style);
        let mut parser = Parser::new(&mut input);
        let mut decl_parser = DeclParser {
            declarations: &mut declarations,
        };
        for result in RuleBodyParser::new(&mut parser, &mut decl_parser) {
            let _ = result;
        }
    }

    let rules = if declarations.is_empty() {
        Vec::new()
    } else {
        vec![StyleRule {
            selector: Selector::Universal,
            declarations,
        }]
    };
    Outcome::ok(rules)
}

/// Validate a sheet-leading `@charset` rule.
///
/// The tokenizer consumes a `@charset` at the very start of the sheet
/// itself, so the at-rule parser never sees it; only non-leading
/// occurrences reach the charset arm below.
fn validate_leading_charset(css: &str, label: &str, diags: &mut Vec<Diagnostic>) {
    let Some(rest) = css.strip_prefix("@charset") else {
        return;
    };
    // A longer at-keyword like `@charset-x` is someone else's rule.
    if !rest.starts_with(|c: char| c.is_whitespace() || c == '"' || c == '\'') {
        return;
    }
    let charset = rest
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .trim_matches(|c| c == '"' || c == '\'');
    if !charset.eq_ignore_ascii_case("utf-8") {
        diags.push(
            Diagnostic::new(format!("unsupported charset: {charset}"))
                .with_context(json!({ "source": label })),
        );
    }
}

// ============================================================================
// Rule parser
// ============================================================================

/// The at-rule kinds this parser understands. Everything else is reported
/// as `unsupported css rule` from `parse_prelude` and skipped.
enum AtRulePrelude {
    /// `@media all` — nested rules flatten into the surrounding list.
    Media,
    /// `@charset` — validated in the prelude, nothing to keep.
    Charset,
    /// `@font-face` — silently dropped.
    FontFace,
}

struct SheetParser<'a> {
    rules: &'a mut Vec<StyleRule>,
    diags: &'a mut Vec<Diagnostic>,
    label: &'a str,
}

impl SheetParser<'_> {
    fn diag(&mut self, message: String, context: serde_json::Value) {
        self.diags.push(Diagnostic::new(message).with_context(context));
    }
}

impl<'i> AtRuleParser<'i> for SheetParser<'_> {
    type Prelude = AtRulePrelude;
    type AtRule = ();
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        if name.eq_ignore_ascii_case("media") {
            let start = input.position();
            while input.next().is_ok() {}
            let medium = input.slice_from(start).trim().to_ascii_lowercase();
            if medium == "all" {
                Ok(AtRulePrelude::Media)
            } else {
                let label = self.label;
                self.diag(
                    format!("unsupported media rule: {medium}"),
                    json!({ "source": label }),
                );
                Err(input.new_custom_error(()))
            }
        } else if name.eq_ignore_ascii_case("charset") {
            let charset = match input.next() {
                Ok(Token::QuotedString(s)) | Ok(Token::Ident(s)) => s.as_ref().to_string(),
                _ => String::new(),
            };
            while input.next().is_ok() {}
            if !charset.eq_ignore_ascii_case("utf-8") {
                let label = self.label;
                self.diag(
                    format!("unsupported charset: {charset}"),
                    json!({ "source": label }),
                );
            }
            Ok(AtRulePrelude::Charset)
        } else if name.eq_ignore_ascii_case("font-face") {
            Ok(AtRulePrelude::FontFace)
        } else {
            let label = self.label;
            self.diag(
                format!("unsupported css rule: @{name}"),
                json!({ "source": label }),
            );
            while input.next().is_ok() {}
            Err(input.new_custom_error(()))
        }
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::AtRule, ParseError<'i, Self::Error>> {
        match prelude {
            AtRulePrelude::Media => {
                // Flatten nested rules at the position the block appeared.
                let mut nested = SheetParser {
                    rules: &mut *self.rules,
                    diags: &mut *self.diags,
                    label: self.label,
                };
                for result in RuleBodyParser::new(input, &mut nested) {
                    let _ = result;
                }
            }
            AtRulePrelude::Charset | AtRulePrelude::FontFace => {}
        }
        Ok(())
    }

    fn rule_without_block(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
    ) -> Result<Self::AtRule, ()> {
        match prelude {
            AtRulePrelude::Charset => Ok(()),
            _ => Err(()),
        }
    }
}

impl<'i> QualifiedRuleParser<'i> for SheetParser<'_> {
    type Prelude = Vec<Selector>;
    type QualifiedRule = ();
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        let start = input.position();
        while input.next().is_ok() {}
        let raw = input.slice_from(start);

        // Each comma-separated selector parses independently; failures drop
        // only that alternative.
        let mut selectors = Vec::new();
        for part in raw.split(',') {
            match parse_selector(part) {
                Some(selector) => selectors.push(selector),
                None => {
                    let label = self.label;
                    self.diag(
                        "unsupported selector".to_string(),
                        json!({ "selector": part.trim(), "source": label }),
                    );
                }
            }
        }
        Ok(selectors)
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        let mut selectors = prelude;
        if selectors.is_empty() {
            // No valid selector alternative survived; drop the whole rule.
            return Ok(());
        }

        let mut declarations = Vec::new();
        let mut decl_parser = DeclParser {
            declarations: &mut declarations,
        };
        for result in RuleBodyParser::new(input, &mut decl_parser) {
            let _ = result;
        }

        let selector = if selectors.len() == 1 {
            selectors.remove(0)
        } else {
            Selector::Or(selectors)
        };
        self.rules.push(StyleRule {
            selector,
            declarations,
        });
        Ok(())
    }
}

// Media blocks contain rules, not declarations.
impl<'i> cssparser::DeclarationParser<'i> for SheetParser<'_> {
    type Declaration = ();
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        _name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
        _start: &ParserState,
    ) -> Result<Self::Declaration, ParseError<'i, Self::Error>> {
        Err(input.new_custom_error(()))
    }
}

impl<'i> RuleBodyItemParser<'i, (), ()> for SheetParser<'_> {
    fn parse_declarations(&self) -> bool {
        false
    }
    fn parse_qualified(&self) -> bool {
        true
    }
}

// ============================================================================
// Declaration parser
// ============================================================================

struct DeclParser<'a> {
    declarations: &'a mut Vec<StyleDeclaration>,
}

impl<'i> cssparser::DeclarationParser<'i> for DeclParser<'_> {
    type Declaration = ();
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
        _start: &ParserState,
    ) -> Result<Self::Declaration, ParseError<'i, Self::Error>> {
        // Keep the raw value text; an empty value still records the
        // property name.
        let start = input.position();
        while input.next().is_ok() {}
        let raw = input.slice_from(start).trim();
        self.declarations.push(StyleDeclaration {
            property: name.as_ref().to_string(),
            value: if raw.is_empty() {
                None
            } else {
                Some(raw.to_string())
            },
        });
        Ok(())
    }
}

impl<'i> AtRuleParser<'i> for DeclParser<'_> {
    type Prelude = ();
    type AtRule = ();
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        _name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        Err(input.new_custom_error(()))
    }

    fn parse_block<'t>(
        &mut self,
        _prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::AtRule, ParseError<'i, Self::Error>> {
        Err(input.new_custom_error(()))
    }
}

impl<'i> QualifiedRuleParser<'i> for DeclParser<'_> {
    type Prelude = ();
    type QualifiedRule = ();
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        Err(input.new_custom_error(()))
    }

    fn parse_block<'t>(
        &mut self,
        _prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        Err(input.new_custom_error(()))
    }
}

impl<'i> RuleBodyItemParser<'i, (), ()> for DeclParser<'_> {
    fn parse_declarations(&self) -> bool {
        true
    }
    fn parse_qualified(&self) -> bool {
        false
    }
}
