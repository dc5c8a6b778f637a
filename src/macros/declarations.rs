//! Type declaration rendering for registered virtual modules.

use crate::macros::registry::ModuleExportTable;

const HEADER: &str = "// Generated by vmacro. Do not edit.\n";

/// Renders one `declare module` block.
pub fn render_module_declaration(module: &str, types: &[String]) -> String {
    let body = types
        .iter()
        .flat_map(|text| text.lines())
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("  {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    let name = module.replace('\\', "\\\\").replace('\'', "\\'");
    if body.is_empty() {
        format!("declare module '{name}' {{}}\n")
    } else {
        format!("declare module '{name}' {{\n{body}\n}}\n")
    }
}

/// Renders the declarations of every module in the table.
pub fn render_declarations(table: &ModuleExportTable) -> String {
    let mut out = String::from(HEADER);
    for (module, entry) in table.iter() {
        out.push('\n');
        out.push_str(&render_module_declaration(module, &entry.types));
    }
    out
}
