//! The expansion pass: finds macro calls and runs their handlers.
//!
//! A pass walks the program one top-level item at a time. The item is
//! detached from the body while it is walked, so handlers can edit the rest of
//! the program through the [`Helper`] while the call site itself is borrowed
//! by the [`MacroContext`].
//!
//! # Invariants
//! - Arguments are expanded before an auto-expanding handler runs; tasks
//!   choose what to expand through [`Request`]s, drained in order.
//! - A replacement is not revisited in the same pass; the next pass picks up
//!   any macro calls it contains.
//! - The first error stops the walk and aborts the file.

use swc_core::common::Spanned;
use swc_core::ecma::ast::{Expr, Module, ModuleDecl, ModuleItem};
use swc_core::ecma::visit::{VisitMut, VisitMutWith};

use crate::ast::sweep::{is_removed_item, RemovalSweep};
use crate::ast::{ScopeIndex, SourceText, Toolkit};
use crate::config::TransformOptions;
use crate::errors::{HandlerError, HandlerResult, MacroError, SourceSite};
use crate::macros::{Handler, Macro, MacroRegistry, MacroTask, Request, Step};
use crate::transform::context::{Location, MacroContext, StateMap};
use crate::transform::helper::{Body, Helper};
use crate::transform::imports::{collect_bindings, consume_import, ImportBinding};
use crate::transform::matcher::{resolve_callee, Resolution};
use crate::transform::ExpansionStep;

/// One call being expanded.
struct Site<'m> {
    mac: &'m Macro,
    module: &'m str,
    site: Option<SourceSite>,
}

impl Site<'_> {
    fn location(&self) -> Option<Location> {
        self.site.as_ref().map(|s| Location {
            line: s.line,
            column: s.column,
        })
    }
}

/// Per-file expansion state, alive across all passes.
pub(crate) struct Expansion<'r> {
    registry: &'r MacroRegistry,
    source: &'r SourceText,
    options: &'r TransformOptions,
    toolkit: Toolkit,
    scope: ScopeIndex,
    body: Body,
    bindings: Vec<ImportBinding>,
    traversal_state: StateMap,
    transform_state: StateMap,
    pass: usize,
    applied: usize,
    trace: Vec<ExpansionStep>,
    error: Option<MacroError>,
}

impl<'r> Expansion<'r> {
    pub fn new(
        registry: &'r MacroRegistry,
        source: &'r SourceText,
        options: &'r TransformOptions,
        scope: ScopeIndex,
        bindings: Vec<ImportBinding>,
        items: Vec<ModuleItem>,
    ) -> Self {
        Self {
            registry,
            source,
            options,
            toolkit: Toolkit::new(source.cm.clone(), source.syntax),
            scope,
            body: Body::new(items),
            bindings,
            traversal_state: StateMap::new(),
            transform_state: StateMap::new(),
            pass: 0,
            applied: 0,
            trace: Vec::new(),
            error: None,
        }
    }

    /// Re-resolves bindings after the body changed. `shell` is the parsed
    /// module with its body moved out.
    pub fn refresh_scope(&mut self, shell: &mut Module) {
        shell.body = std::mem::take(&mut self.body.items);
        self.scope.refresh(shell);
        self.body.items = std::mem::take(&mut shell.body);
    }

    pub fn finish(self) -> (Vec<ModuleItem>, Vec<ExpansionStep>) {
        (self.body.items, self.trace)
    }

    // ------------------------------------------------------------------
    // Passes
    // ------------------------------------------------------------------

    /// Runs pass number `pass`; returns how many macros were applied.
    pub fn run_pass(&mut self, pass: usize) -> Result<usize, MacroError> {
        self.pass = pass;
        self.applied = 0;
        self.traversal_state.clear();

        let mut index = 0;
        while index < self.body.len() {
            index = self.expand_item(index)?;
        }
        tracing::debug!(file = %self.source.path, pass, applied = self.applied, "expansion pass");
        Ok(self.applied)
    }

    /// Consumes macro imports added during the pass; returns how many
    /// bindings were found. Earlier bindings are kept.
    pub fn collect_new_bindings(&mut self) -> usize {
        let found = collect_bindings(&mut self.body.items, self.registry, self.options.keep_imports);
        let count = found.len();
        self.bindings.extend(found);
        count
    }

    // ------------------------------------------------------------------
    // Expansion entry points
    // ------------------------------------------------------------------

    /// Expands top-level item `index`; returns the index of the item after it.
    fn expand_item(&mut self, index: usize) -> Result<usize, MacroError> {
        let mut item = self.body.detach(index);
        item.visit_mut_with(self);
        if let Some(err) = self.error.take() {
            self.body.reattach(item);
            return Err(err);
        }
        if is_removed_item(&item) {
            return Ok(self.body.discard());
        }
        item.visit_mut_with(&mut RemovalSweep);
        Ok(self.body.reattach(item) + 1)
    }

    /// Expands every macro call inside `expr`.
    fn expand_expr(&mut self, expr: &mut Expr) -> Result<(), MacroError> {
        expr.visit_mut_with(self);
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        expr.visit_mut_with(&mut RemovalSweep);
        Ok(())
    }

    fn expand_arguments(&mut self, slot: &mut Expr) -> Result<(), MacroError> {
        if let Expr::Call(call) = slot {
            for arg in &mut call.args {
                self.expand_expr(&mut arg.expr)?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Applying one macro
    // ------------------------------------------------------------------

    fn expand_call(&mut self, slot: &mut Expr, resolution: Resolution) -> Result<(), MacroError> {
        let (mac, module) = match resolution {
            Resolution::Macro { mac, module } => (mac, module),
            Resolution::Unknown { name, module } => {
                return Err(MacroError::UnknownMacro {
                    name,
                    module,
                    file: self.source.path.clone(),
                    site: self.source.site(slot.span()),
                });
            }
        };
        let site = Site {
            mac: &mac,
            module: &module,
            site: self.source.site(slot.span()),
        };
        let location = site.location();

        // Counted before the handler runs; a failing handler aborts the file anyway.
        self.applied += 1;
        self.trace.push(ExpansionStep {
            pass: self.pass,
            macro_name: mac.name().to_string(),
            module: module.clone(),
            location,
        });
        tracing::trace!(
            macro_name = mac.name(),
            module = %module,
            pass = self.pass,
            location = ?location,
            "applying macro"
        );

        match mac.handler().clone() {
            Handler::ContextOnly(f) => self.invoke(slot, &site, |cx, _, _| f(cx)),
            Handler::WithToolkit(f) => self.invoke(slot, &site, |cx, toolkit, _| f(cx, toolkit)),
            Handler::WithHelper(f) => self.invoke(slot, &site, |cx, toolkit, helper| f(cx, toolkit, helper)),
            Handler::Task(factory) => self.drive(slot, &site, factory()),
        }
    }

    /// Runs an auto-expanding handler.
    fn invoke<F>(&mut self, slot: &mut Expr, site: &Site<'_>, handler: F) -> Result<(), MacroError>
    where
        F: FnOnce(&mut MacroContext<'_>, &Toolkit, &mut Helper<'_>) -> HandlerResult,
    {
        self.expand_arguments(slot)?;
        let result = {
            let (mut cx, toolkit, mut helper) = self.handler_view(slot, site);
            handler(&mut cx, toolkit, &mut helper)
        };
        result.map_err(|source| self.handler_error(site, source))
    }

    /// Runs a cooperative handler to completion.
    fn drive(
        &mut self,
        slot: &mut Expr,
        site: &Site<'_>,
        mut task: Box<dyn MacroTask>,
    ) -> Result<(), MacroError> {
        loop {
            let step = {
                let (mut cx, toolkit, mut helper) = self.handler_view(slot, site);
                task.resume(&mut cx, toolkit, &mut helper)
            };
            match step {
                Ok(Step::Done) => return Ok(()),
                Ok(Step::Expand(requests)) => {
                    for request in requests {
                        self.fulfil(slot, site, request)?;
                    }
                }
                Err(source) => return Err(self.handler_error(site, source)),
            }
        }
    }

    fn fulfil(&mut self, slot: &mut Expr, site: &Site<'_>, request: Request) -> Result<(), MacroError> {
        tracing::trace!(macro_name = site.mac.name(), ?request, "expansion request");
        match request {
            Request::Argument(index) => {
                let Expr::Call(call) = slot else {
                    return Err(self.invalid_yield(site, "arguments were requested after the call site was replaced"));
                };
                let count = call.args.len();
                let Some(arg) = call.args.get_mut(index) else {
                    return Err(self.invalid_yield(
                        site,
                        format!("argument {index} was requested, but the call has {count}"),
                    ));
                };
                self.expand_expr(&mut arg.expr)
            }
            Request::Arguments => {
                if !matches!(slot, Expr::Call(_)) {
                    return Err(self.invalid_yield(site, "arguments were requested after the call site was replaced"));
                }
                self.expand_arguments(slot)
            }
            Request::Item(index) => {
                self.check_item(site, index)?;
                self.expand_item(index).map(drop)
            }
            Request::Import(index) => {
                self.check_item(site, index)?;
                self.collect_import(site, index)
            }
        }
    }

    /// Items that are detached right now contain the requesting call.
    fn check_item(&self, site: &Site<'_>, index: usize) -> Result<(), MacroError> {
        if index >= self.body.len() {
            return Err(self.invalid_yield(
                site,
                format!("item {index} was requested, but the program has {}", self.body.len()),
            ));
        }
        if self.body.is_hole(index) {
            return Err(self.invalid_yield(
                site,
                format!("item {index} contains the call that requested it"),
            ));
        }
        Ok(())
    }

    fn collect_import(&mut self, site: &Site<'_>, index: usize) -> Result<(), MacroError> {
        if !matches!(self.body.items[index], ModuleItem::ModuleDecl(ModuleDecl::Import(_))) {
            return Err(self.invalid_yield(site, format!("item {index} is not an import declaration")));
        }
        let Some(consumed) = consume_import(&mut self.body.items[index], self.registry, self.options.keep_imports)
        else {
            return Ok(());
        };
        if !consumed.keep_item {
            self.body.remove(index);
        }
        self.bindings.extend(consumed.bindings);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------

    /// Splits `self` into what a handler sees.
    fn handler_view<'s>(
        &'s mut self,
        slot: &'s mut Expr,
        site: &'s Site<'_>,
    ) -> (MacroContext<'s>, &'s Toolkit, Helper<'s>) {
        let Self {
            source,
            options,
            toolkit,
            scope,
            body,
            bindings,
            traversal_state,
            transform_state,
            ..
        } = self;
        let cx = MacroContext::new(
            slot,
            &source.path,
            source.text(),
            (options.dev, options.ssr),
            site.mac.name(),
            site.module,
            site.location(),
            traversal_state,
            transform_state,
        );
        (cx, toolkit, Helper::new(body, bindings, scope))
    }

    fn handler_error(&self, site: &Site<'_>, source: HandlerError) -> MacroError {
        MacroError::Handler {
            macro_name: site.mac.name().to_string(),
            file: self.source.path.clone(),
            site: site.site.clone(),
            source,
        }
    }

    fn invalid_yield(&self, site: &Site<'_>, reason: impl Into<String>) -> MacroError {
        MacroError::InvalidYield {
            macro_name: site.mac.name().to_string(),
            file: self.source.path.clone(),
            reason: reason.into(),
            site: site.site.clone(),
        }
    }
}

impl VisitMut for Expansion<'_> {
    fn visit_mut_expr(&mut self, expr: &mut Expr) {
        if self.error.is_some() {
            return;
        }
        let resolution = match expr {
            Expr::Call(call) => resolve_callee(&call.callee, &self.bindings, &self.scope),
            _ => None,
        };
        match resolution {
            Some(resolution) => {
                if let Err(err) = self.expand_call(expr, resolution) {
                    self.error = Some(err);
                }
            }
            None => expr.visit_mut_children_with(self),
        }
    }
}
