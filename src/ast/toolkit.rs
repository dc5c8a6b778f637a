//! The syntax toolkit handed to macro handlers.
//!
//! Builders are associated functions and need no toolkit instance; parsing and
//! printing go through the instance because they share the file's source map.

use serde_json::{Map, Number as JsonNumber, Value};
use swc_core::common::sync::Lrc;
use swc_core::common::{FileName, SourceMap, DUMMY_SP};
use swc_core::ecma::ast::{
    ArrayLit, Bool, CallExpr, Callee, EsVersion, Expr, ExprOrSpread, ExprStmt, Ident, IdentName,
    KeyValueProp, Lit, MemberExpr, MemberProp, Module, ModuleItem, Null, Number, ObjectLit, Prop,
    PropName, PropOrSpread, Stmt, Str, UnaryExpr, UnaryOp,
};
use swc_core::ecma::parser::{parse_file_as_expr, parse_file_as_module};

use crate::ast::source::{emit_module, SourceSyntax};
use crate::errors::MacroError;
use crate::macros::is_valid_identifier;

/// Parsing, printing and node construction for handlers.
pub struct Toolkit {
    cm: Lrc<SourceMap>,
    syntax: SourceSyntax,
}

impl Toolkit {
    pub(crate) fn new(cm: Lrc<SourceMap>, syntax: SourceSyntax) -> Self {
        Self { cm, syntax }
    }

    /// A toolkit with its own source map, for use outside a transform.
    pub fn standalone(syntax: SourceSyntax) -> Self {
        Self::new(Default::default(), syntax)
    }

    pub fn syntax(&self) -> SourceSyntax {
        self.syntax
    }

    // ------------------------------------------------------------------
    // Parsing and printing
    // ------------------------------------------------------------------

    /// Parses a single expression such as `console.log("hi")`.
    pub fn parse_expr(&self, code: &str) -> Result<Box<Expr>, MacroError> {
        let file = self.snippet(code);
        let mut recovered = Vec::new();
        let parsed = parse_file_as_expr(
            &file,
            self.syntax.to_swc(),
            EsVersion::latest(),
            None,
            &mut recovered,
        );
        match (parsed, recovered.into_iter().next()) {
            (Ok(expr), None) => Ok(expr),
            (Err(err), _) | (Ok(_), Some(err)) => Err(snippet_error(code, err)),
        }
    }

    /// Parses statements and module declarations (imports included).
    pub fn parse_items(&self, code: &str) -> Result<Vec<ModuleItem>, MacroError> {
        let file = self.snippet(code);
        let mut recovered = Vec::new();
        let parsed = parse_file_as_module(
            &file,
            self.syntax.to_swc(),
            EsVersion::latest(),
            None,
            &mut recovered,
        );
        match (parsed, recovered.into_iter().next()) {
            (Ok(module), None) => Ok(module.body),
            (Err(err), _) | (Ok(_), Some(err)) => Err(snippet_error(code, err)),
        }
    }

    pub fn print_expr(&self, expr: &Expr) -> Result<String, MacroError> {
        let printed = self.print_items(&[Self::expr_stmt(expr.clone())])?;
        Ok(printed.trim_end().trim_end_matches(';').to_string())
    }

    pub fn print_items(&self, items: &[ModuleItem]) -> Result<String, MacroError> {
        let module = Module {
            span: DUMMY_SP,
            body: items.to_vec(),
            shebang: None,
        };
        emit_module(&self.cm, None, &module).map_err(|source| MacroError::Io {
            path: "<macro>".into(),
            source,
        })
    }

    fn snippet(&self, code: &str) -> Lrc<swc_core::common::SourceFile> {
        self.cm
            .new_source_file(FileName::Custom("<macro>".into()).into(), code.to_string())
    }

    // ------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------

    pub fn string(value: impl Into<String>) -> Expr {
        Expr::Lit(Lit::Str(Str {
            span: DUMMY_SP,
            value: value.into().into(),
            raw: None,
        }))
    }

    pub fn number(value: f64) -> Expr {
        Expr::Lit(Lit::Num(Number {
            span: DUMMY_SP,
            value,
            raw: None,
        }))
    }

    pub fn boolean(value: bool) -> Expr {
        Expr::Lit(Lit::Bool(Bool {
            span: DUMMY_SP,
            value,
        }))
    }

    pub fn null() -> Expr {
        Expr::Lit(Lit::Null(Null { span: DUMMY_SP }))
    }

    /// `void 0`
    pub fn undefined() -> Expr {
        Expr::Unary(UnaryExpr {
            span: DUMMY_SP,
            op: UnaryOp::Void,
            arg: Box::new(Self::number(0.0)),
        })
    }

    pub fn ident(name: &str) -> Ident {
        Ident::new_no_ctxt(name.into(), DUMMY_SP)
    }

    pub fn ident_expr(name: &str) -> Expr {
        Expr::Ident(Self::ident(name))
    }

    pub fn member(object: Expr, property: &str) -> Expr {
        Expr::Member(MemberExpr {
            span: DUMMY_SP,
            obj: Box::new(object),
            prop: MemberProp::Ident(IdentName::new(property.into(), DUMMY_SP)),
        })
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
        Expr::Call(CallExpr {
            span: DUMMY_SP,
            callee: Callee::Expr(Box::new(callee)),
            args: args
                .into_iter()
                .map(|expr| ExprOrSpread {
                    spread: None,
                    expr: Box::new(expr),
                })
                .collect(),
            ..Default::default()
        })
    }

    pub fn array(elements: Vec<Expr>) -> Expr {
        Expr::Array(ArrayLit {
            span: DUMMY_SP,
            elems: elements
                .into_iter()
                .map(|expr| {
                    Some(ExprOrSpread {
                        spread: None,
                        expr: Box::new(expr),
                    })
                })
                .collect(),
        })
    }

    pub fn expr_stmt(expr: Expr) -> ModuleItem {
        ModuleItem::Stmt(Stmt::Expr(ExprStmt {
            span: DUMMY_SP,
            expr: Box::new(expr),
        }))
    }

    /// Builds the literal expression for a JSON value.
    pub fn from_value(value: &Value) -> Expr {
        match value {
            Value::Null => Self::null(),
            Value::Bool(b) => Self::boolean(*b),
            Value::Number(n) => Self::number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => Self::string(s.as_str()),
            Value::Array(items) => Self::array(items.iter().map(Self::from_value).collect()),
            Value::Object(map) => Expr::Object(ObjectLit {
                span: DUMMY_SP,
                props: map
                    .iter()
                    .map(|(key, value)| {
                        let key = if is_valid_identifier(key) {
                            PropName::Ident(IdentName::new(key.as_str().into(), DUMMY_SP))
                        } else {
                            PropName::Str(Str {
                                span: DUMMY_SP,
                                value: key.as_str().into(),
                                raw: None,
                            })
                        };
                        PropOrSpread::Prop(Box::new(Prop::KeyValue(KeyValueProp {
                            key,
                            value: Box::new(Self::from_value(value)),
                        })))
                    })
                    .collect(),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Static evaluation
    // ------------------------------------------------------------------

    /// The value of a string literal or an expression-free template literal.
    pub fn string_value(expr: &Expr) -> Option<String> {
        match expr {
            Expr::Lit(Lit::Str(s)) => Some(s.value.to_string()),
            Expr::Tpl(tpl) if tpl.exprs.is_empty() => tpl
                .quasis
                .first()
                .and_then(|q| q.cooked.as_ref())
                .map(|cooked| cooked.to_string()),
            Expr::Paren(paren) => Self::string_value(&paren.expr),
            _ => None,
        }
    }

    /// Statically evaluates JSON-like literals: strings, numbers, booleans,
    /// `null`, arrays and plain objects of those.
    pub fn literal_value(expr: &Expr) -> Option<Value> {
        match expr {
            Expr::Lit(Lit::Null(_)) => Some(Value::Null),
            Expr::Lit(Lit::Bool(b)) => Some(Value::Bool(b.value)),
            Expr::Lit(Lit::Num(n)) => json_number(n.value),
            Expr::Unary(UnaryExpr {
                op: UnaryOp::Minus,
                arg,
                ..
            }) => match &**arg {
                Expr::Lit(Lit::Num(n)) => json_number(-n.value),
                _ => None,
            },
            Expr::Paren(paren) => Self::literal_value(&paren.expr),
            Expr::Array(array) => array
                .elems
                .iter()
                .map(|elem| match elem {
                    Some(ExprOrSpread { spread: None, expr }) => Self::literal_value(expr),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            Expr::Object(object) => {
                let mut map = Map::new();
                for prop in &object.props {
                    let PropOrSpread::Prop(prop) = prop else {
                        return None;
                    };
                    let Prop::KeyValue(kv) = &**prop else {
                        return None;
                    };
                    let key = match &kv.key {
                        PropName::Ident(ident) => ident.sym.to_string(),
                        PropName::Str(s) => s.value.to_string(),
                        PropName::Num(n) => n.value.to_string(),
                        _ => return None,
                    };
                    map.insert(key, Self::literal_value(&kv.value)?);
                }
                Some(Value::Object(map))
            }
            _ => Self::string_value(expr).map(Value::String),
        }
    }
}

fn json_number(value: f64) -> Option<Value> {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        return Some(Value::Number(JsonNumber::from(value as i64)));
    }
    JsonNumber::from_f64(value).map(Value::Number)
}

fn snippet_error(code: &str, err: swc_core::ecma::parser::error::Error) -> MacroError {
    MacroError::Parse {
        file: "<macro>".into(),
        message: format!("{} in `{code}`", err.kind().msg()),
        site: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_and_prints_calls() {
        let toolkit = Toolkit::standalone(SourceSyntax::EcmaScript);
        let call = Toolkit::call(
            Toolkit::member(Toolkit::ident_expr("console"), "log"),
            vec![Toolkit::string("hi"), Toolkit::undefined()],
        );
        assert_eq!(toolkit.print_expr(&call).unwrap(), "console.log(\"hi\", void 0)");
    }

    #[test]
    fn parses_snippets() {
        let toolkit = Toolkit::standalone(SourceSyntax::TypeScript);
        let expr = toolkit.parse_expr("[1, 'two', { three: true }]").unwrap();
        assert_eq!(
            Toolkit::literal_value(&expr),
            Some(json!([1, "two", { "three": true }]))
        );
        let items = toolkit.parse_items("import a from 'a';\nlet b: number = 1;").unwrap();
        assert_eq!(items.len(), 2);
        assert!(toolkit.parse_expr("1 +").is_err());
    }

    #[test]
    fn literal_round_trip_through_json() {
        let value = json!({ "name": "x", "list": [1, -2.5, null], "weird key": false });
        let expr = Toolkit::from_value(&value);
        assert_eq!(Toolkit::literal_value(&expr), Some(value));
    }

    #[test]
    fn non_literals_have_no_value() {
        let toolkit = Toolkit::standalone(SourceSyntax::EcmaScript);
        let expr = toolkit.parse_expr("`a${b}`").unwrap();
        assert_eq!(Toolkit::string_value(&expr), None);
        let expr = toolkit.parse_expr("[1, x]").unwrap();
        assert_eq!(Toolkit::literal_value(&expr), None);
        let expr = toolkit.parse_expr("`plain`").unwrap();
        assert_eq!(Toolkit::string_value(&expr).as_deref(), Some("plain"));
    }
}
