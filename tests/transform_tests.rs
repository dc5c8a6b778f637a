//! End-to-end tests for the transform driver.
//!
//! Each test feeds a small module through the demo registry in `common` and
//! checks the printed output or the error it aborts with.

mod common;

use common::{expand, expand_with, registry};
use vmacro::transform::Location;
use vmacro::{MacroError, Outcome, TransformOptions};

fn transform(source: &str) -> Result<Outcome, MacroError> {
    registry().transform(source, "src/main.ts", &TransformOptions::default())
}

fn transform_err(source: &str) -> MacroError {
    match transform(source) {
        Err(err) => err,
        Ok(outcome) => panic!("expected an error, got {outcome:?}"),
    }
}

fn squash(code: &str) -> String {
    code.chars().filter(|c| !c.is_whitespace()).collect()
}

// ============================================================================
// UNTOUCHED FILES
// ============================================================================

#[test]
fn file_without_macro_imports_is_untouched() {
    let outcome = transform("import { answer } from '@data';\nconsole.log(answer);\n").unwrap();
    assert!(outcome.is_untouched());
    assert_eq!(outcome.code(), None);
}

#[test]
fn transformed_output_is_a_fixed_point() {
    let code = expand("import { echo } from '@echo';\necho('hi');\n");
    assert!(transform(&code).unwrap().is_untouched());
}

#[test]
fn unused_macro_import_is_still_consumed() {
    let code = expand("import { echo } from '@echo';\nconst a = 1;\n");
    assert!(!code.contains("@echo"), "{code}");
    assert!(code.contains("const a = 1"), "{code}");
}

#[test]
fn parse_errors_abort_the_file() {
    let err = transform_err("import { echo } from '@echo';\nconst = ;\n");
    assert!(matches!(err, MacroError::Parse { ref file, .. } if file == "src/main.ts"));
    assert!(err.site().is_some());
}

// ============================================================================
// BASIC EXPANSION
// ============================================================================

#[test]
fn echo_replaces_its_call() {
    let code = expand("import { echo } from '@echo';\necho('hi');\n");
    assert!(code.contains("console.log(\"hihihi\")"), "{code}");
    assert!(!code.contains("@echo"), "{code}");
    assert!(!code.contains("echo("), "{code}");
}

#[test]
fn other_imports_are_left_alone() {
    let code = expand(
        "import { answer } from '@data';\nimport { concat } from '@text';\nconst s: string = concat('a', 'b');\nconsole.log(answer, s);\n",
    );
    assert!(code.contains("@data"), "{code}");
    assert!(!code.contains("@text"), "{code}");
    assert!(code.contains("\"ab\""), "{code}");
}

#[test]
fn nested_calls_expand_inside_out() {
    let code = expand("import { reverse } from '@text';\nconst s = reverse(reverse('abc'));\n");
    assert!(code.contains("\"abc\""), "{code}");
    assert!(!code.contains("reverse"), "{code}");
}

#[test]
fn auto_expanding_handlers_see_expanded_arguments() {
    let code = expand(
        "import { concat, reverse } from '@text';\nimport { echo } from '@echo';\necho(concat(reverse('ab'), 'c'));\n",
    );
    assert!(code.contains("console.log(\"bacbacbac\")"), "{code}");
}

#[test]
fn handlers_may_parse_snippets() {
    let code = expand("import { shout } from '@text';\nexport const loud = shout('hey');\n");
    assert!(code.contains("\"HEY\""), "{code}");
}

#[test]
fn calls_inside_functions_and_classes_expand() {
    let code = expand(
        "import { concat } from '@text';\nfunction f() { return concat('x', 'y'); }\nclass C { m() { return concat('p', 'q'); } }\n",
    );
    assert!(code.contains("\"xy\""), "{code}");
    assert!(code.contains("\"pq\""), "{code}");
    assert!(!code.contains("concat"), "{code}");
}

// ============================================================================
// CALL-SITE MATCHING
// ============================================================================

#[test]
fn shadowed_names_are_not_macro_calls() {
    let code = expand(
        "import { echo } from '@echo';\necho('hi');\n{\n  const echo = (s: string) => s;\n  echo('inner');\n}\nfunction g(echo: (s: string) => void) { echo('param'); }\n",
    );
    assert!(code.contains("console.log(\"hihihi\")"), "{code}");
    assert!(code.contains("echo(\"inner\")") || code.contains("echo('inner')"), "{code}");
    assert!(code.contains("echo(\"param\")") || code.contains("echo('param')"), "{code}");
}

#[test]
fn namespace_calls_match_named_calls() {
    let named = expand("import { echo } from '@echo';\necho('hi');\n");
    let namespaced = expand("import * as m from '@echo';\nm.echo('hi');\n");
    let computed = expand("import * as m from '@echo';\nm['echo']('hi');\n");
    assert_eq!(named, namespaced);
    assert_eq!(named, computed);
}

#[test]
fn default_imports_bind_the_whole_module() {
    let named = expand("import { echo } from '@echo';\necho('hi');\n");
    let defaulted = expand("import e from '@echo';\ne.echo('hi');\n");
    assert_eq!(named, defaulted);
}

#[test]
fn the_latest_binding_of_a_name_wins() {
    // `rebind` imports `concat` as `x` while `x` is still bound to `echo`.
    let code = expand(
        "import { echo as x } from '@echo';\nimport { rebind } from '@inject';\nconst r = rebind();\n",
    );
    assert!(squash(&code).contains("constr=\"ab\""), "{code}");
    assert!(!code.contains("console.log"), "{code}");
}

#[test]
fn aliased_imports_match_by_local_name() {
    let code = expand("import { echo as say } from '@echo';\nsay('yo');\n");
    assert!(code.contains("console.log(\"yoyoyo\")"), "{code}");
}

#[test]
fn references_that_are_not_calls_are_left_alone() {
    let code = expand(
        "import { echo } from '@echo';\nimport * as m from '@echo';\nconst alias = m;\necho('a');\n",
    );
    assert!(code.contains("const alias = m"), "{code}");
    assert!(code.contains("console.log(\"aaa\")"), "{code}");
}

#[test]
fn unknown_macro_fails_only_when_called() {
    let code = expand("import { echo, notReal } from '@echo';\necho('a');\n");
    assert!(!code.contains("notReal"), "{code}");

    let err = transform_err("import { notReal } from '@echo';\nnotReal();\n");
    match err {
        MacroError::UnknownMacro {
            name,
            module,
            file,
            site,
        } => {
            assert_eq!(name, "notReal");
            assert_eq!(module, "@echo");
            assert_eq!(file, "src/main.ts");
            let site = site.expect("call site");
            assert_eq!((site.line, site.column), (2, 1));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn unknown_namespace_member_fails() {
    let err = transform_err("import * as m from '@echo';\nm.nothing();\n");
    assert!(matches!(err, MacroError::UnknownMacro { ref name, .. } if name == "nothing"));
}

// ============================================================================
// REMOVAL
// ============================================================================

#[test]
fn removal_drops_statements_and_voids_expressions() {
    let code = expand(
        "import { self_remover } from '@flow';\nself_remover();\nconst x = self_remover();\nfunction f() { self_remover(); return 1; }\n",
    );
    assert!(!code.contains("self_remover"), "{code}");
    assert!(code.contains("const x = void 0"), "{code}");
    assert!(code.contains("return 1"), "{code}");
}

#[test]
fn removal_under_a_lone_statement_keeps_the_syntax_valid() {
    let code = expand("import { self_remover } from '@flow';\nif (Math.random()) self_remover();\n");
    assert!(!code.contains("self_remover"), "{code}");
    assert!(transform(&code).unwrap().is_untouched());
}

// ============================================================================
// PASSES
// ============================================================================

#[test]
fn settled_file_reports_applying_passes_only() {
    let outcome = transform("import { self_remover } from '@flow';\nself_remover();\n").unwrap();
    let output = outcome.into_output().unwrap();
    assert_eq!(output.passes, 1);
    assert_eq!(output.trace.len(), 1);
    assert_eq!(output.trace[0].macro_name, "self_remover");
    assert_eq!(output.trace[0].module, "@flow");
    assert_eq!(output.trace[0].location, Some(Location { line: 2, column: 1 }));
}

#[test]
fn endless_expansion_hits_the_pass_limit() {
    let err = transform_err("import { relay } from '@flow';\nrelay();\n");
    assert!(matches!(err, MacroError::MaxPassesExceeded { max_passes: 5, .. }), "{err:?}");
}

#[test]
fn pass_limit_has_a_floor() {
    let options = TransformOptions::default().with_max_passes(0);
    let err = registry()
        .transform("import { relay } from '@flow';\nrelay();\n", "src/main.ts", &options)
        .unwrap_err();
    assert!(matches!(err, MacroError::MaxPassesExceeded { max_passes: 2, .. }), "{err:?}");
}

#[test]
fn state_maps_have_their_own_lifetimes() {
    let outcome = transform(
        "import { counter, defer_counter } from '@flow';\nconst a = counter();\nconst b = defer_counter();\nconst c = counter();\n",
    )
    .unwrap();
    let output = outcome.into_output().unwrap();
    let code = squash(&output.code);
    // Pass one: file count 1 and 2, pass count 1 and 2.
    assert!(code.contains("consta=[1,1]"), "{code}");
    assert!(code.contains("constc=[2,2]"), "{code}");
    // Pass two: the file count keeps going, the pass count restarts.
    assert!(code.contains("constb=[3,1]"), "{code}");
    assert_eq!(output.passes, 2);
}

// ============================================================================
// HANDLER FAILURES
// ============================================================================

#[test]
fn handler_errors_are_wrapped_with_the_call_site() {
    let err = transform_err("import { fail } from '@flow';\n\nconst x = fail();\n");
    match &err {
        MacroError::Handler {
            macro_name,
            file,
            site,
            source,
        } => {
            assert_eq!(macro_name, "fail");
            assert_eq!(file, "src/main.ts");
            assert_eq!(source.to_string(), "boom");
            let site = site.as_ref().expect("call site");
            assert_eq!((site.line, site.column), (3, 11));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn handler_argument_errors_surface() {
    let err = transform_err("import { echo } from '@echo';\nconst n = 1;\necho(n);\n");
    match err {
        MacroError::Handler { source, .. } => {
            assert!(source.to_string().contains("must be a string literal"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

// ============================================================================
// OPTIONS
// ============================================================================

#[test]
fn keep_imports_leaves_a_bare_import() {
    let options = TransformOptions::default().with_keep_imports(true);
    let code = expand_with("import { echo } from '@echo';\necho('hi');\n", &options);
    assert!(code.contains("@echo"), "{code}");
    assert!(!code.contains("{ echo }"), "{code}");
    assert!(code.contains("console.log(\"hihihi\")"), "{code}");
}

#[test]
fn development_mode_keeps_imports_by_default() {
    let code = expand_with(
        "import { echo } from '@echo';\necho('hi');\n",
        &TransformOptions::development(),
    );
    assert!(code.contains("@echo"), "{code}");
}

#[test]
fn javascript_files_are_parsed_without_types() {
    let outcome = registry()
        .transform(
            "import { concat } from '@text';\nexport default concat('j', 's');\n",
            "src/plain.js",
            &TransformOptions::default(),
        )
        .unwrap();
    assert!(outcome.code().unwrap().contains("\"js\""));
}
