//! # vmacro Test Fixtures
//!
//! Demo macros shared by the integration tests, and a registry that exports
//! them from a handful of virtual modules:
//!
//! | Module     | Macros                                              |
//! |------------|-----------------------------------------------------|
//! | `@echo`    | `echo`                                              |
//! | `@text`    | `reverse` (task), `concat`, `shout`                 |
//! | `@flow`    | `self_remover`, `relay`, `fail`, `counter`, `defer_counter` |
//! | `@inject`  | `use_echo`, `import_then_call` (task), `scan`, `late_scan`, `prelude`, `grab` (task), `join_all` (task), `bad_request` (task), `rebind`, `bad_yield` (task) |
//! | `@data`    | plain source module                                 |

#![allow(dead_code)]

use vmacro::transform::{Helper, ImportSpec};
use vmacro::{
    define_macro, HandlerError, Macro, MacroContext, MacroRegistry, MacroTask, Outcome, Request,
    Step, Toolkit, TransformOptions,
};

pub const DATA_SOURCE: &str = "export const answer = 42;\n";

fn string_arg(cx: &MacroContext<'_>, index: usize) -> Result<String, HandlerError> {
    cx.arg(index)
        .and_then(Toolkit::string_value)
        .ok_or_else(|| format!("argument {index} of `{}` must be a string literal", cx.macro_name()).into())
}

// ============================================================================
// @echo
// ============================================================================

/// `echo('hi')` → `console.log("hihihi")`
pub fn echo() -> Macro {
    define_macro("echo")
        .unwrap()
        .with_signature("(message: string): void", Some("Logs the message three times over."))
        .with_toolkit_handler(|cx, _toolkit| {
            let message = string_arg(cx, 0)?;
            cx.replace_with(Toolkit::call(
                Toolkit::member(Toolkit::ident_expr("console"), "log"),
                vec![Toolkit::string(message.repeat(3))],
            ));
            Ok(())
        })
        .unwrap()
}

// ============================================================================
// @text
// ============================================================================

/// Expands its argument first, then reverses the string.
#[derive(Default)]
pub struct Reverse {
    expanded: bool,
}

impl MacroTask for Reverse {
    fn resume(
        &mut self,
        cx: &mut MacroContext<'_>,
        _toolkit: &Toolkit,
        _helper: &mut Helper<'_>,
    ) -> Result<Step, HandlerError> {
        if !self.expanded {
            self.expanded = true;
            return Ok(Step::expand(Request::Argument(0)));
        }
        let text = string_arg(cx, 0)?;
        cx.replace_with(Toolkit::string(text.chars().rev().collect::<String>()));
        Ok(Step::Done)
    }
}

pub fn reverse() -> Macro {
    define_macro("reverse")
        .unwrap()
        .with_signature("(text: string): string", None)
        .with_task(Reverse::default)
        .unwrap()
}

/// Joins string literal arguments.
pub fn concat() -> Macro {
    define_macro("concat")
        .unwrap()
        .with_signature("(...parts: string[]): string", None)
        .with_handler(|cx| {
            let mut joined = String::new();
            for index in 0..cx.args().len() {
                joined.push_str(&string_arg(cx, index)?);
            }
            cx.replace_with(Toolkit::string(joined));
            Ok(())
        })
        .unwrap()
}

/// Upper-cases its argument, which is parsed back through the toolkit.
pub fn shout() -> Macro {
    define_macro("shout")
        .unwrap()
        .with_signature("(text: string): string", None)
        .with_toolkit_handler(|cx, toolkit| {
            let text = string_arg(cx, 0)?;
            let expr = toolkit.parse_expr(&format!("{:?}", text.to_uppercase()))?;
            cx.replace_with(*expr);
            Ok(())
        })
        .unwrap()
}

// ============================================================================
// @flow
// ============================================================================

pub fn self_remover() -> Macro {
    define_macro("self_remover")
        .unwrap()
        .with_signature("(): void", None)
        .with_handler(|cx| {
            cx.remove();
            Ok(())
        })
        .unwrap()
}

/// Replaces itself with another call to itself, forever.
pub fn relay() -> Macro {
    define_macro("relay")
        .unwrap()
        .with_signature("(): void", None)
        .with_handler(|cx| {
            cx.replace_with(Toolkit::call(Toolkit::ident_expr("relay"), vec![]));
            Ok(())
        })
        .unwrap()
}

pub fn fail() -> Macro {
    define_macro("fail")
        .unwrap()
        .with_signature("(): never", None)
        .with_handler(|cx| {
            cx.replace_with(Toolkit::null());
            Err("boom".into())
        })
        .unwrap()
}

/// Replaces itself with `[callsInFile, callsInPass]`.
pub fn counter() -> Macro {
    define_macro("counter")
        .unwrap()
        .with_signature("(): [number, number]", None)
        .with_handler(|cx| {
            let in_file = bump(cx.transform_state());
            let in_pass = bump(cx.traversal_state());
            cx.replace_with(Toolkit::array(vec![
                Toolkit::number(in_file as f64),
                Toolkit::number(in_pass as f64),
            ]));
            Ok(())
        })
        .unwrap()
}

/// Replaces itself with a `counter()` call for the next pass.
pub fn defer_counter() -> Macro {
    define_macro("defer_counter")
        .unwrap()
        .with_signature("(): [number, number]", None)
        .with_handler(|cx| {
            cx.replace_with(Toolkit::call(Toolkit::ident_expr("counter"), vec![]));
            Ok(())
        })
        .unwrap()
}

fn bump(state: &mut vmacro::transform::StateMap) -> usize {
    let next = state.get::<usize>("count").copied().unwrap_or(0) + 1;
    state.insert("count", next);
    next
}

// ============================================================================
// @inject
// ============================================================================

/// Imports `echo` itself and hands its argument over: `use_echo('x')` → `echo('x')`.
pub fn use_echo() -> Macro {
    define_macro("use_echo")
        .unwrap()
        .with_signature("(message: string): void", None)
        .with_helper_handler(|cx, _toolkit, helper| {
            let message = string_arg(cx, 0)?;
            helper.prepend_imports(&[ImportSpec::named("@echo", "echo")]);
            cx.replace_with(Toolkit::call(
                Toolkit::ident_expr("echo"),
                vec![Toolkit::string(message)],
            ));
            Ok(())
        })
        .unwrap()
}

/// Imports `echo`, asks for the import to be collected, and checks the
/// binding is live before calling it.
#[derive(Default)]
pub struct ImportThenCall {
    import: Option<usize>,
}

impl MacroTask for ImportThenCall {
    fn resume(
        &mut self,
        cx: &mut MacroContext<'_>,
        _toolkit: &Toolkit,
        helper: &mut Helper<'_>,
    ) -> Result<Step, HandlerError> {
        if self.import.is_none() {
            let paths = helper.append_imports(&[ImportSpec::aliased("@echo", "echo", "say")]);
            self.import = paths.first().copied();
            return Ok(Step::expand(Request::Import(paths[0])));
        }
        let call = Toolkit::call(Toolkit::ident_expr("say"), vec![Toolkit::string("ab")]);
        if !helper.expr_contains_macros(&call) {
            return Err("the imported binding is not live yet".into());
        }
        cx.replace_with(call);
        Ok(Step::Done)
    }
}

pub fn import_then_call() -> Macro {
    define_macro("import_then_call")
        .unwrap()
        .with_signature("(): void", None)
        .with_task(ImportThenCall::default)
        .unwrap()
}

/// Replaces itself with `contains_macros` over the whole program body.
pub fn scan() -> Macro {
    define_macro("scan")
        .unwrap()
        .with_signature("(): boolean[]", None)
        .with_helper_handler(|cx, _toolkit, helper| {
            let paths: Vec<usize> = (0..helper.items().len()).collect();
            let found = helper.contains_macros(&paths);
            cx.replace_with(Toolkit::array(found.into_iter().map(Toolkit::boolean).collect()));
            Ok(())
        })
        .unwrap()
}

/// Like `scan`, but asks only after its own call site was replaced.
pub fn late_scan() -> Macro {
    define_macro("late_scan")
        .unwrap()
        .with_signature("(): boolean[]", None)
        .with_helper_handler(|cx, _toolkit, helper| {
            cx.replace_with(Toolkit::null());
            let paths: Vec<usize> = (0..helper.items().len()).collect();
            let found = helper.contains_macros(&paths);
            cx.replace_with(Toolkit::array(found.into_iter().map(Toolkit::boolean).collect()));
            Ok(())
        })
        .unwrap()
}

/// Puts `echo('p')` at the top of the program and removes itself.
pub fn prelude() -> Macro {
    define_macro("prelude")
        .unwrap()
        .with_signature("(): void", None)
        .with_helper_handler(|cx, _toolkit, helper| {
            let call = Toolkit::call(Toolkit::ident_expr("echo"), vec![Toolkit::string("p")]);
            helper.prepend_to_body(vec![Toolkit::expr_stmt(call)]);
            cx.remove();
            Ok(())
        })
        .unwrap()
}

/// Appends `const later = concat('l', 'm')`, has it expanded, and replaces
/// itself with the printed result.
#[derive(Default)]
pub struct Grab {
    item: Option<usize>,
}

impl MacroTask for Grab {
    fn resume(
        &mut self,
        cx: &mut MacroContext<'_>,
        toolkit: &Toolkit,
        helper: &mut Helper<'_>,
    ) -> Result<Step, HandlerError> {
        let Some(index) = self.item else {
            let items = toolkit.parse_items("const later = concat('l', 'm');")?;
            let paths = helper.append_to_body(items);
            self.item = paths.first().copied();
            return Ok(Step::Expand(paths.into_iter().map(Request::Item).collect()));
        };
        let item = helper.item(index).ok_or("appended item is gone")?;
        let printed = toolkit.print_items(std::slice::from_ref(item))?;
        cx.replace_with(Toolkit::string(printed.trim()));
        Ok(Step::Done)
    }
}

pub fn grab() -> Macro {
    define_macro("grab")
        .unwrap()
        .with_signature("(): string", None)
        .with_task(Grab::default)
        .unwrap()
}

/// Resumes once with no requests, then expands all arguments and joins them.
#[derive(Default)]
pub struct JoinAll {
    resumed: usize,
}

impl MacroTask for JoinAll {
    fn resume(
        &mut self,
        cx: &mut MacroContext<'_>,
        _toolkit: &Toolkit,
        _helper: &mut Helper<'_>,
    ) -> Result<Step, HandlerError> {
        self.resumed += 1;
        match self.resumed {
            1 => Ok(Step::Expand(Vec::new())),
            2 => Ok(Step::expand(Request::Arguments)),
            _ => {
                let mut joined = String::new();
                for index in 0..cx.args().len() {
                    joined.push_str(&string_arg(cx, index)?);
                }
                cx.replace_with(Toolkit::string(joined));
                Ok(Step::Done)
            }
        }
    }
}

pub fn join_all() -> Macro {
    define_macro("join_all")
        .unwrap()
        .with_signature("(...parts: string[]): string", None)
        .with_task(JoinAll::default)
        .unwrap()
}

/// Makes the request named by its argument: `'range'`, `'import'` or
/// `'replaced'`. Each one is invalid.
pub struct BadRequest;

impl MacroTask for BadRequest {
    fn resume(
        &mut self,
        cx: &mut MacroContext<'_>,
        _toolkit: &Toolkit,
        helper: &mut Helper<'_>,
    ) -> Result<Step, HandlerError> {
        let request = match string_arg(cx, 0)?.as_str() {
            "range" => Request::Item(helper.items().len() + 3),
            "import" => {
                let plain = (0..helper.items().len())
                    .find(|&index| !helper.is_pending(index))
                    .ok_or("no settled item")?;
                Request::Import(plain)
            }
            "replaced" => {
                cx.replace_with(Toolkit::null());
                Request::Argument(0)
            }
            other => return Err(format!("unknown mode `{other}`").into()),
        };
        Ok(Step::expand(request))
    }
}

pub fn bad_request() -> Macro {
    define_macro("bad_request")
        .unwrap()
        .with_signature("(mode: 'range' | 'import' | 'replaced'): void", None)
        .with_task(|| BadRequest)
        .unwrap()
}

/// Imports `concat` under the name `x` and replaces itself with `x('a', 'b')`.
pub fn rebind() -> Macro {
    define_macro("rebind")
        .unwrap()
        .with_signature("(): string", None)
        .with_helper_handler(|cx, _toolkit, helper| {
            helper.append_imports(&[ImportSpec::aliased("@text", "concat", "x")]);
            cx.replace_with(Toolkit::call(
                Toolkit::ident_expr("x"),
                vec![Toolkit::string("a"), Toolkit::string("b")],
            ));
            Ok(())
        })
        .unwrap()
}

/// Requests expansion of the item that contains its own call.
pub struct BadYield;

impl MacroTask for BadYield {
    fn resume(
        &mut self,
        _cx: &mut MacroContext<'_>,
        _toolkit: &Toolkit,
        helper: &mut Helper<'_>,
    ) -> Result<Step, HandlerError> {
        let own = (0..helper.items().len())
            .find(|&index| helper.is_pending(index))
            .ok_or("no pending item")?;
        Ok(Step::expand(Request::Item(own)))
    }
}

pub fn bad_yield() -> Macro {
    define_macro("bad_yield")
        .unwrap()
        .with_signature("(): void", None)
        .with_task(|| BadYield)
        .unwrap()
}

// ============================================================================
// REGISTRY AND HELPERS
// ============================================================================

pub fn registry() -> MacroRegistry {
    let mut registry = MacroRegistry::new();
    registry.register_macros("@echo", vec![echo()]).unwrap();
    registry
        .register_macros("@text", vec![reverse(), concat(), shout()])
        .unwrap();
    registry
        .register_macros(
            "@flow",
            vec![self_remover(), relay(), fail(), counter(), defer_counter()],
        )
        .unwrap();
    registry
        .register_macros(
            "@inject",
            vec![
                use_echo(),
                import_then_call(),
                scan(),
                late_scan(),
                prelude(),
                grab(),
                join_all(),
                bad_request(),
                rebind(),
                bad_yield(),
            ],
        )
        .unwrap();
    registry.register_module("@data", DATA_SOURCE).unwrap();
    registry
}

/// Transforms with default options and returns the code, panicking if the
/// file was untouched or failed.
pub fn expand(source: &str) -> String {
    expand_with(source, &TransformOptions::default())
}

pub fn expand_with(source: &str, options: &TransformOptions) -> String {
    match registry().transform(source, "src/main.ts", options) {
        Ok(Outcome::Transformed(output)) => output.code,
        Ok(Outcome::Untouched) => panic!("expected a transformation of:\n{source}"),
        Err(err) => panic!("transform failed: {:?}", miette::Report::new(err)),
    }
}
