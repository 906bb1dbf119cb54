//! Attribute and class compilation
//!
//! Attributes are compiled in one of two modes:
//!
//! - buffer mode, for tags: each attribute is written straight into the
//!   output, as literal text when its value is constant and as a
//!   `jade.attr(...)` call otherwise;
//! - mapping mode, for attribute blocks and mixin calls: the attributes
//!   become one `{"key": value, ...}` literal.
//!
//! `class` attributes are collected separately and always come last.

use jadenim_ast::{Attribute, Attributes, Location};

use super::buffer::nim_string_literal;
use super::Compiler;
use crate::constant::Value;
use crate::runtime;
use crate::translate::translate_attribute;
use crate::utils::error::WarningKind;

/// Keys starting with `data` carry non-string values as JSON.
fn is_data_key(key: &str) -> bool {
    key.starts_with("data")
}

/// Class attributes split off from the rest.
struct ClassList<'a> {
    values: Vec<&'a str>,
    escaped: Vec<bool>,
}

fn split_classes(attrs: &[Attribute]) -> (Vec<&Attribute>, ClassList<'_>) {
    let mut others = Vec::new();
    let mut classes = ClassList {
        values: Vec::new(),
        escaped: Vec::new(),
    };
    for attr in attrs {
        if attr.name == "class" {
            classes.values.push(&attr.val);
            classes.escaped.push(attr.escaped);
        } else {
            others.push(attr);
        }
    }
    (others, classes)
}

fn flag_list(flags: &[bool]) -> String {
    let flags: Vec<String> = flags.iter().map(bool::to_string).collect();
    format!("[{}]", flags.join(", "))
}

impl Compiler<'_> {
    /// Write a tag's attributes into the output.
    pub(super) fn visit_attributes(&mut self, attributes: &Attributes, location: &Location) {
        if !attributes.attribute_blocks.is_empty() {
            let mut parts = Vec::with_capacity(attributes.attribute_blocks.len() + 1);
            if !attributes.attrs.is_empty() {
                parts.push(self.attributes_mapping(&attributes.attrs, location));
            }
            parts.extend(attributes.attribute_blocks.iter().map(|b| translate_attribute(b)));
            self.warn(WarningKind::UnportedAttributeBlock, location);
            let terse = self.mode.terse;
            self.buf.buffer_expr(&format!(
                "jade.attrs(jade.merge([{}]), {})",
                parts.join(", "),
                terse
            ));
        } else if !attributes.attrs.is_empty() {
            self.buffer_attributes(&attributes.attrs, location);
        }
    }

    fn buffer_attributes(&mut self, attrs: &[Attribute], location: &Location) {
        let terse = self.mode.terse;
        let (others, classes) = split_classes(attrs);

        for attr in others {
            match self.fold(&attr.val) {
                Some(value) => {
                    let text = runtime::attr(&attr.name, &value, attr.escaped, terse);
                    self.buf.buffer_text(&text);
                }
                None => {
                    let expr = format!(
                        "jade.attr({}, {}, {}, {})",
                        nim_string_literal(&attr.name),
                        translate_attribute(&attr.val),
                        attr.escaped,
                        terse
                    );
                    self.buf.buffer_expr(&expr);
                }
            }
        }

        if classes.values.is_empty() {
            return;
        }
        match self.fold_all(&classes.values) {
            Some(values) => {
                let text = runtime::cls(&values, &classes.escaped);
                self.buf.buffer_text(&text);
            }
            None => {
                self.warn(WarningKind::UnportedClassJoin, location);
                let expr = format!(
                    "jade.cls([{}], {})",
                    translate_attribute(&classes.values.join(", ")),
                    flag_list(&classes.escaped)
                );
                self.buf.buffer_expr(&expr);
            }
        }
    }

    /// Compile attributes into a `{"key": value}` mapping literal.
    pub(super) fn attributes_mapping(&mut self, attrs: &[Attribute], location: &Location) -> String {
        let (others, classes) = split_classes(attrs);
        let mut entries = Vec::with_capacity(attrs.len());

        for attr in others {
            let key = nim_string_literal(&attr.name);
            let value = match self.fold(&attr.val) {
                Some(value) => {
                    let keep_raw = is_data_key(&attr.name) && !matches!(value, Value::Str(_));
                    let value = if attr.escaped && !keep_raw {
                        Value::Str(runtime::escape(&value))
                    } else {
                        value
                    };
                    value.to_json_string().unwrap_or_else(|| "nil".to_string())
                }
                None => {
                    let val = translate_attribute(&attr.val);
                    match (attr.escaped, is_data_key(&attr.name)) {
                        (true, false) => format!("jade.escape({})", val),
                        (true, true) => format!("(jade.escape({}))", val),
                        (false, _) => val,
                    }
                }
            };
            entries.push(format!("{}: {}", key, value));
        }

        if !classes.values.is_empty() {
            let value = match self.fold_all(&classes.values) {
                Some(values) => {
                    let joined: Vec<Value> = values
                        .iter()
                        .zip(&classes.escaped)
                        .map(|(value, &escaped)| {
                            let text = runtime::join_classes(value);
                            Value::Str(if escaped { runtime::escape_str(&text) } else { text })
                        })
                        .collect();
                    nim_string_literal(&runtime::join_classes(&Value::Array(joined)))
                }
                None => {
                    self.warn(WarningKind::UnportedClassJoin, location);
                    format!(
                        "jade.joinClasses([{}])",
                        translate_attribute(&classes.values.join(", "))
                    )
                }
            };
            entries.push(format!("\"class\": {}", value));
        }

        format!("{{{}}}", entries.join(", "))
    }

    /// Fold every expression, or none.
    fn fold_all(&self, sources: &[&str]) -> Option<Vec<Value>> {
        sources.iter().map(|src| self.fold(src)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::CompileOptions;
    use crate::filters::NoFilters;

    fn compiler() -> Compiler<'static> {
        Compiler::new(CompileOptions::default(), &NoFilters)
    }

    #[test]
    fn test_mapping_orders_classes_last() {
        let mut c = compiler();
        let attrs = vec![
            Attribute::new("class", "'a'", true),
            Attribute::new("id", "'x'", true),
            Attribute::new("class", "'b'", true),
        ];
        assert_eq!(
            c.attributes_mapping(&attrs, &Location::default()),
            "{\"id\": \"x\", \"class\": \"a b\"}"
        );
        assert!(c.warnings.is_empty());
    }

    #[test]
    fn test_mapping_dynamic_values() {
        let mut c = compiler();
        let attrs = vec![
            Attribute::new("href", "'/u/' + id", true),
            Attribute::new("data-x", "opts", true),
            Attribute::new("title", "raw", false),
        ];
        assert_eq!(
            c.attributes_mapping(&attrs, &Location::default()),
            "{\"href\": jade.escape(\"/u/\" & id), \"data-x\": (jade.escape(opts)), \"title\": raw}"
        );
    }

    #[test]
    fn test_mapping_keeps_data_json() {
        let mut c = compiler();
        let attrs = vec![
            Attribute::new("data-n", "[1, 2]", true),
            Attribute::new("alt", "'<b>'", true),
        ];
        assert_eq!(
            c.attributes_mapping(&attrs, &Location::default()),
            "{\"data-n\": [1,2], \"alt\": \"&lt;b&gt;\"}"
        );
    }

    #[test]
    fn test_attribute_blocks_merge_static_attributes() {
        let mut c = compiler();
        let attributes = Attributes {
            attrs: vec![Attribute::new("id", "'x'", true)],
            attribute_blocks: vec!["extra".to_string()],
        };
        c.visit_attributes(&attributes, &Location::at_line(3));
        assert_eq!(
            c.buf.lines(),
            ["  jade_buf.add($(jade.attrs(jade.merge([{\"id\": \"x\"}, extra]), false)))"]
        );
        assert_eq!(c.warnings[0].kind, WarningKind::UnportedAttributeBlock);
    }

    #[test]
    fn test_dynamic_class_warns() {
        let mut c = compiler();
        let attrs = vec![Attribute::new("class", "cls", true)];
        assert_eq!(
            c.attributes_mapping(&attrs, &Location::at_line(7)),
            "{\"class\": jade.joinClasses([cls])}"
        );
        assert_eq!(c.warnings.len(), 1);
        assert_eq!(c.warnings[0].kind, WarningKind::UnportedClassJoin);
        assert_eq!(c.warnings[0].line, Some(7));
    }
}
