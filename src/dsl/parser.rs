//! Parser (C6): recursive-descent parser enforcing the grammar and SSA
//! rule of spec.md §4.5.
//!
//! ```text
//! script    := (statement | macro)*
//! statement := DECLARATION IDENT IDENT IDENT          # exactly 4 tokens
//! macro     := DECLARATION KIND "begin" body "end"
//! body      := (statement | macro)*
//! ```

use crate::dsl::ast::{Macro, MacroKind, Script, Statement};
use crate::dsl::tokenizer::{tokenize, Token};
use crate::error::{SpockError, SpockResult};
use std::collections::HashMap;

struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        self.pos += 1;
        tok
    }

    fn line_of_last(&self) -> usize {
        self.tokens
            .get(self.pos.saturating_sub(1))
            .map_or(0, |t| t.line)
    }

    fn column_of_last(&self) -> usize {
        self.tokens
            .get(self.pos.saturating_sub(1))
            .map_or(0, |t| t.column)
    }
}

fn strip_decl_prefix(raw: &str) -> String {
    raw.trim_start_matches('@').to_string()
}

/// Parse a full script, enforcing SSA per scope and the `verb`-macro
/// `@result` requirement.
pub fn parse_script(source: &str) -> SpockResult<Script> {
    let tokens = tokenize(source);
    let mut cursor = Cursor { tokens: &tokens, pos: 0 };
    let mut scope: HashMap<String, usize> = HashMap::new();
    let script = parse_body_as_script(&mut cursor, &mut scope)?;
    if cursor.pos < cursor.tokens.len() {
        let tok = &cursor.tokens[cursor.pos];
        return Err(SpockError::ParseAt {
            message: format!("unexpected token '{}'", tok.value),
            line: tok.line,
            column: tok.column,
        });
    }
    Ok(script)
}

fn parse_body_as_script(
    cursor: &mut Cursor,
    scope: &mut HashMap<String, usize>,
) -> SpockResult<Script> {
    let mut statements = Vec::new();
    let mut macros = Vec::new();
    while let Some(tok) = cursor.peek() {
        if tok.value == "end" {
            break;
        }
        if is_declaration(tok) {
            // Lookahead: is this a macro header (DECL KIND begin) or a
            // plain statement (DECL IDENT IDENT IDENT)?
            let kind_tok = cursor.tokens.get(cursor.pos + 1);
            if kind_tok.is_some_and(|t| MacroKind::from_keyword(&t.value).is_some()) {
                macros.push(parse_macro(cursor, scope)?);
            } else {
                statements.push(parse_statement(cursor, scope)?);
            }
        } else {
            let tok = cursor.peek().unwrap();
            return Err(SpockError::ParseAt {
                message: format!("expected a declaration, found '{}'", tok.value),
                line: tok.line,
                column: tok.column,
            });
        }
    }
    Ok(Script { statements, macros })
}

fn is_declaration(tok: &Token) -> bool {
    tok.value.starts_with('@')
}

fn register_declaration(
    scope: &mut HashMap<String, usize>,
    name: &str,
    line: usize,
    column: usize,
) -> SpockResult<()> {
    if let Some(&first_line) = scope.get(name) {
        return Err(SpockError::ParseAt {
            message: format!(
                "duplicate declaration '@{name}' (first declared at line {first_line}, redeclared at line {line})"
            ),
            line,
            column,
        });
    }
    scope.insert(name.to_string(), line);
    Ok(())
}

fn parse_statement(
    cursor: &mut Cursor,
    scope: &mut HashMap<String, usize>,
) -> SpockResult<Statement> {
    let decl_tok = cursor.advance().expect("checked by caller").clone();
    let line = decl_tok.line;
    let declaration = strip_decl_prefix(&decl_tok.value);
    register_declaration(scope, &declaration, line, decl_tok.column)?;

    let mut rest = Vec::new();
    for _ in 0..3 {
        match cursor.advance() {
            Some(t) => rest.push(t.value.clone()),
            None => {
                return Err(SpockError::ParseAt {
                    message: "statement ended before 4 tokens were read".to_string(),
                    line,
                    column: decl_tok.column,
                })
            }
        }
    }
    Ok(Statement {
        declaration,
        subject: rest[0].clone(),
        verb: rest[1].clone(),
        object: rest[2].clone(),
        line,
    })
}

fn parse_macro(cursor: &mut Cursor, outer_scope: &mut HashMap<String, usize>) -> SpockResult<Macro> {
    let decl_tok = cursor.advance().expect("checked by caller").clone();
    let line = decl_tok.line;
    let column = decl_tok.column;
    let name = strip_decl_prefix(&decl_tok.value);
    register_declaration(outer_scope, &name, line, column)?;

    let kind_tok = cursor.advance().ok_or_else(|| SpockError::ParseAt {
        message: format!("macro '@{name}' is missing its kind"),
        line,
        column,
    })?;
    let kind = MacroKind::from_keyword(&kind_tok.value).ok_or_else(|| SpockError::ParseAt {
        message: format!("invalid macro kind '{}'", kind_tok.value),
        line: kind_tok.line,
        column: kind_tok.column,
    })?;

    let begin_tok = cursor.advance().ok_or_else(|| SpockError::ParseAt {
        message: format!("macro '@{name}' is missing 'begin'"),
        line,
        column,
    })?;
    if begin_tok.value != "begin" {
        return Err(SpockError::ParseAt {
            message: format!("expected 'begin' after macro '@{name}', found '{}'", begin_tok.value),
            line: begin_tok.line,
            column: begin_tok.column,
        });
    }

    // SSA applies per enclosing macro, not globally.
    let mut inner_scope: HashMap<String, usize> = HashMap::new();
    let body_script = parse_body_as_script(cursor, &mut inner_scope)?;

    match cursor.advance() {
        Some(t) if t.value == "end" => {}
        Some(t) => {
            return Err(SpockError::ParseAt {
                message: format!("expected 'end' to close macro '@{name}', found '{}'", t.value),
                line: t.line,
                column: t.column,
            })
        }
        None => {
            return Err(SpockError::ParseAt {
                message: format!("macro '@{name}' was never closed with 'end'"),
                line: cursor.line_of_last(),
                column: cursor.column_of_last(),
            })
        }
    }

    let result = Macro {
        name,
        kind,
        body: body_script.statements,
        nested_macros: body_script.macros,
        line,
    };

    if result.kind == MacroKind::Verb && !result.declares_result() {
        return Err(SpockError::ParseAt {
            message: format!("verb macro '@{}' must declare @result", result.name),
            line: result.line,
            column,
        });
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_statement() {
        let script = parse_script("@x a Is b").unwrap();
        assert_eq!(script.statements.len(), 1);
        assert_eq!(script.statements[0].declaration, "x");
    }

    #[test]
    fn ssa_violation_names_both_lines() {
        let err = parse_script("@x a Is b\n@x c Is d").unwrap_err();
        match err {
            SpockError::ParseAt { message, line, .. } => {
                assert!(message.contains("line 1"));
                assert_eq!(line, 2);
            }
            _ => panic!("expected ParseAt"),
        }
    }

    #[test]
    fn statement_must_have_exactly_four_tokens() {
        assert!(parse_script("@x a Is").is_err());
    }

    #[test]
    fn missing_begin_is_an_error() {
        assert!(parse_script("@Test theory\n@a x Is y\nend").is_err());
    }

    #[test]
    fn unclosed_macro_is_an_error() {
        assert!(parse_script("@Test theory begin\n@a x Is y").is_err());
    }

    #[test]
    fn invalid_kind_is_an_error() {
        assert!(parse_script("@Test bogus begin\nend").is_err());
    }

    #[test]
    fn verb_macro_without_result_is_an_error() {
        let err = parse_script("@Foo verb begin\n@tmp $subject Identity $subject\nend").unwrap_err();
        assert!(matches!(err, SpockError::ParseAt { .. }));
    }

    #[test]
    fn verb_macro_with_result_is_accepted() {
        let script = parse_script("@Foo verb begin\n@result $subject Identity $subject\nend").unwrap();
        assert_eq!(script.macros.len(), 1);
        assert!(script.macros[0].declares_result());
    }

    #[test]
    fn ssa_is_scoped_per_macro() {
        // @a declared at top level and again inside @Test's body: allowed,
        // because SSA is enforced per enclosing scope, not globally.
        let script = parse_script("@a p Is q\n@Test theory begin\n@a x Is y\nend").unwrap();
        assert_eq!(script.statements.len(), 1);
        assert_eq!(script.macros[0].body.len(), 1);
    }

    #[test]
    fn nested_macros_parse() {
        let src = "@Outer theory begin\n@Inner verb begin\n@result $subject Identity $subject\nend\nend";
        let script = parse_script(src).unwrap();
        assert_eq!(script.macros[0].nested_macros.len(), 1);
    }
}
