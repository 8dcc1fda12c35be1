//! Undefined-name check for truth tests.
//!
//! tera reads a bare name missing from the context as `false` when it is an
//! `if`/`elif` condition or an `and`/`or`/`not` operand, where an output
//! expression would fail. Parsed templates are scanned here so those names
//! abort a render the same way.
use std::collections::BTreeSet;

use serde_json::Value;
use tera::Template;
use tera::ast::{Expr, ExprVal, Node};

/// Names tera provides on its own.
const BUILTIN_NAMES: [&str; 2] = ["loop", "__tera_context"];

/// Names used as truth tests in `template` that neither `context` nor the
/// template itself defines, sorted.
///
/// Names bound anywhere in the template by `set`, `for` or a macro argument
/// count as defined. `x is defined` and `x | default(...)` are never
/// reported.
pub fn undefined_condition_names(template: &Template, context: &Value) -> Vec<String> {
    let mut scan = Scan::default();
    scan.nodes(&template.ast);
    for definition in template.macros.values() {
        scan.bound.extend(definition.args.keys().cloned());
        scan.nodes(&definition.body);
    }

    scan.tested
        .iter()
        .filter(|name| !is_defined(name, &scan.bound, context))
        .cloned()
        .collect()
}

fn is_defined(name: &str, bound: &BTreeSet<String>, context: &Value) -> bool {
    let root = name.split(['.', '[']).next().unwrap_or(name);
    if BUILTIN_NAMES.contains(&root) || bound.contains(root) {
        return true;
    }
    if name.contains('[') {
        return context.get(root).is_some();
    }
    tera::dotted_pointer(context, name).is_some()
}

#[derive(Debug, Default)]
struct Scan {
    bound: BTreeSet<String>,
    tested: BTreeSet<String>,
}

impl Scan {
    fn nodes(&mut self, nodes: &[Node]) {
        for node in nodes {
            self.node(node);
        }
    }

    fn node(&mut self, node: &Node) {
        match node {
            Node::VariableBlock(_, expr) => self.value(expr),
            Node::Set(_, set) => {
                self.bound.insert(set.key.clone());
                self.value(&set.value);
            }
            Node::FilterSection(_, section, _) => self.nodes(&section.body),
            Node::Block(_, block, _) => self.nodes(&block.body),
            Node::MacroDefinition(_, definition, _) => {
                self.bound.extend(definition.args.keys().cloned());
                self.nodes(&definition.body);
            }
            Node::Forloop(_, forloop, _) => {
                self.bound.insert(forloop.value.clone());
                if let Some(key) = &forloop.key {
                    self.bound.insert(key.clone());
                }
                self.value(&forloop.container);
                self.nodes(&forloop.body);
                if let Some(body) = &forloop.empty_body {
                    self.nodes(body);
                }
            }
            Node::If(branches, _) => {
                for (_, condition, body) in &branches.conditions {
                    self.truth_test(condition);
                    self.nodes(body);
                }
                if let Some((_, body)) = &branches.otherwise {
                    self.nodes(body);
                }
            }
            _ => {}
        }
    }

    /// `expr` is evaluated for truthiness.
    fn truth_test(&mut self, expr: &Expr) {
        match &expr.val {
            ExprVal::Ident(name) => {
                if !expr.has_default_filter() {
                    self.tested.insert(name.clone());
                }
            }
            ExprVal::Logic(logic) => {
                self.truth_test(&logic.lhs);
                self.truth_test(&logic.rhs);
            }
            other => self.nested(other),
        }
    }

    /// `expr` is evaluated for its value.
    fn value(&mut self, expr: &Expr) {
        if expr.negated || matches!(expr.val, ExprVal::Logic(_)) {
            self.truth_test(expr);
        } else {
            self.nested(&expr.val);
        }
    }

    fn nested(&mut self, val: &ExprVal) {
        match val {
            ExprVal::Array(items) => {
                for item in items {
                    self.value(item);
                }
            }
            ExprVal::Math(math) => {
                self.value(&math.lhs);
                self.value(&math.rhs);
            }
            ExprVal::In(contains) => {
                self.value(&contains.lhs);
                self.value(&contains.rhs);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    fn undefined(source: &str, context: &Value) -> Vec<String> {
        let template = Template::new("t", None, source).unwrap();
        undefined_condition_names(&template, context)
    }

    #[test]
    fn bare_name_in_if_is_reported() {
        assert_eq!(
            undefined("{% if missing_flag %}on{% else %}off{% endif %}", &json!({})),
            vec!["missing_flag"]
        );
    }

    #[test]
    fn elif_and_boolean_operands_are_reported() {
        let source = "{% if a %}{% elif not b or c and d %}{% endif %}";
        assert_eq!(
            undefined(source, &json!({"a": false, "c": 0})),
            vec!["b", "d"]
        );
    }

    #[test]
    fn defined_and_falsy_names_pass() {
        let context = json!({"flag": false, "empty": "", "none": null});
        assert!(undefined("{% if flag or empty or none %}x{% endif %}", &context).is_empty());
    }

    #[test]
    fn dotted_names_resolve_through_objects() {
        let context = json!({"git": {"signing": true}});
        assert!(undefined("{% if git.signing %}x{% endif %}", &context).is_empty());
        assert_eq!(
            undefined("{% if git.gpg %}x{% endif %}", &context),
            vec!["git.gpg"]
        );
    }

    #[test]
    fn local_bindings_and_guards_are_not_reported() {
        let source = "{% set on = true %}{% for k, v in items %}\
                      {% if v and k and on and loop.first %}{% endif %}{% endfor %}\
                      {% if maybe is defined %}{% endif %}\
                      {% if other | default(value=false) %}{% endif %}";
        assert!(undefined(source, &json!({"items": {"a": 1}})).is_empty());
    }

    #[test]
    fn macro_bodies_are_scanned() {
        let source = "{% macro row(enabled) %}{% if enabled and extra %}x{% endif %}{% endmacro row %}";
        assert_eq!(undefined(source, &json!({})), vec!["extra"]);
    }

    #[test]
    fn output_expressions_are_left_to_tera() {
        assert!(undefined("{{ missing }}", &json!({})).is_empty());
    }
}
