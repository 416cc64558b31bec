//! Fields - typed, identity-bearing references to columns and expressions.
//!
//! A [`Field`] is either a raw column (`table.column`) or a computed
//! expression built from a [`Template`] over other fields. Fields are
//! declared through a [`FieldFactory`], which enforces unique ids for one
//! schema-build session.
//!
//! ```ignore
//! let mut fields = FieldFactory::new();
//! let success = fields.column("expeditions", "success1", Codec::boolean().nullable())?;
//! let count = fields.computed("count_star", Template::metric("count(*)", &[]), Codec::number())?;
//! let rate = fields.computed(
//!     "success_rate",
//!     Template::metric("sum(CASE WHEN {} THEN 1 ELSE 0 END) / {}", &[&success, &count]),
//!     Codec::number(),
//! )?;
//! assert!(rate.is_aggregate());
//! ```

use std::cell::RefCell;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use once_cell::sync::Lazy;
use regex::Regex;

use super::codec::{Codec, Value};
use super::error::{ModelError, ModelResult};

/// Custom display formatter attached to a field.
pub type Formatter = Rc<dyn Fn(&Value) -> String>;

// =============================================================================
// Field
// =============================================================================

/// A named, typed reference to a column or derived expression.
///
/// Cloning is cheap and shares identity. Two fields are the same entity iff
/// their ids are equal.
#[derive(Clone)]
pub struct Field {
    inner: Rc<FieldInner>,
}

struct FieldInner {
    id: String,
    expression: String,
    tables: BTreeSet<String>,
    aggregate: bool,
    codec: Codec,
    display: RefCell<FieldDisplay>,
}

#[derive(Default)]
struct FieldDisplay {
    label: Option<String>,
    formatter: Option<Formatter>,
}

impl Field {
    fn new(
        id: String,
        expression: String,
        tables: BTreeSet<String>,
        aggregate: bool,
        codec: Codec,
    ) -> Self {
        Self {
            inner: Rc::new(FieldInner {
                id,
                expression,
                tables,
                aggregate,
                codec,
                display: RefCell::new(FieldDisplay::default()),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Query-fragment text for this field.
    pub fn expression(&self) -> &str {
        &self.inner.expression
    }

    /// Tables the expression reads from.
    pub fn tables(&self) -> &BTreeSet<String> {
        &self.inner.tables
    }

    /// Whether this field is an aggregate (a metric).
    pub fn is_aggregate(&self) -> bool {
        self.inner.aggregate
    }

    pub fn codec(&self) -> Codec {
        self.inner.codec
    }

    /// Display label, falling back to the id.
    pub fn label(&self) -> String {
        self.inner
            .display
            .borrow()
            .label
            .clone()
            .unwrap_or_else(|| self.inner.id.clone())
    }

    /// Set the display label. Does not affect identity.
    pub fn with_label(&self, label: impl Into<String>) -> &Self {
        self.inner.display.borrow_mut().label = Some(label.into());
        self
    }

    /// Set a custom display formatter. Does not affect identity.
    pub fn with_formatter(&self, formatter: impl Fn(&Value) -> String + 'static) -> &Self {
        self.inner.display.borrow_mut().formatter = Some(Rc::new(formatter));
        self
    }

    /// Set label and formatter together.
    pub fn configure(
        &self,
        label: impl Into<String>,
        formatter: impl Fn(&Value) -> String + 'static,
    ) -> &Self {
        self.with_label(label).with_formatter(formatter)
    }

    /// Format a value of this field for display.
    ///
    /// Custom formatters see every value, including `Null`.
    pub fn format(&self, value: &Value) -> String {
        let formatter = self.inner.display.borrow().formatter.clone();
        match formatter {
            Some(formatter) => formatter(value),
            None => self.inner.codec.format(value),
        }
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Field {}

impl Hash for Field {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("id", &self.inner.id)
            .field("expression", &self.inner.expression)
            .field("tables", &self.inner.tables)
            .field("aggregate", &self.inner.aggregate)
            .field("codec", &self.inner.codec)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.expression)
    }
}

// =============================================================================
// Templates
// =============================================================================

/// `{}` takes the next field, `{n}` the n-th one.
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{(\d*)\}").expect("valid regex"));

/// Expression text with placeholders for referenced fields.
#[derive(Debug, Clone)]
#[must_use = "templates have no effect until passed to FieldFactory::computed"]
pub struct Template {
    text: String,
    fields: Vec<Field>,
    metric: bool,
}

impl Template {
    /// An aggregate expression.
    pub fn metric(text: &str, fields: &[&Field]) -> Self {
        Self::new(text, fields, true)
    }

    /// A non-aggregate expression. Still aggregate if any referenced field is.
    pub fn dimension(text: &str, fields: &[&Field]) -> Self {
        Self::new(text, fields, false)
    }

    fn new(text: &str, fields: &[&Field], metric: bool) -> Self {
        Self {
            text: text.to_string(),
            fields: fields.iter().map(|f| (*f).clone()).collect(),
            metric,
        }
    }

    /// Substitute each placeholder with the referenced field's expression.
    fn render(&self) -> ModelResult<String> {
        let mut out = String::with_capacity(self.text.len());
        let mut last = 0;
        let mut next = 0;

        for caps in PLACEHOLDER.captures_iter(&self.text) {
            let Some(whole) = caps.get(0) else { continue };
            let index = match caps.get(1).map(|m| m.as_str()).filter(|s| !s.is_empty()) {
                Some(digits) => digits.parse::<usize>().unwrap_or(usize::MAX),
                None => {
                    next += 1;
                    next - 1
                }
            };
            let field = self.fields.get(index).ok_or_else(|| ModelError::TemplateArity {
                template: self.text.clone(),
                placeholder: index,
                fields: self.fields.len(),
            })?;
            out.push_str(&self.text[last..whole.start()]);
            out.push_str(field.expression());
            last = whole.end();
        }
        out.push_str(&self.text[last..]);
        Ok(out)
    }
}

// =============================================================================
// Factory
// =============================================================================

/// How column ids are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdStyle {
    /// `table.column`
    #[default]
    Qualified,
    /// `column`; for single-table schemas.
    Bare,
}

/// Declares fields for one schema-build session, rejecting duplicate ids.
#[derive(Debug, Default)]
pub struct FieldFactory {
    used_ids: HashSet<String>,
    id_style: IdStyle,
}

impl FieldFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id_style(mut self, id_style: IdStyle) -> Self {
        self.id_style = id_style;
        self
    }

    /// Declare a raw column.
    ///
    /// The expression is always the qualified `table.column` reference.
    pub fn column(&mut self, table: &str, name: &str, codec: Codec) -> ModelResult<Field> {
        let qualified = format!("{table}.{name}");
        let id = match self.id_style {
            IdStyle::Qualified => qualified.clone(),
            IdStyle::Bare => name.to_string(),
        };
        self.claim(&id)?;

        Ok(Field::new(
            id,
            qualified,
            BTreeSet::from([table.to_string()]),
            false,
            codec,
        ))
    }

    /// Declare a computed field from a template.
    ///
    /// Tables are the union of the referenced fields' tables; the field is
    /// aggregate if the template is a metric or any referenced field is.
    pub fn computed(&mut self, id: &str, template: Template, codec: Codec) -> ModelResult<Field> {
        let expression = template.render()?;
        self.claim(id)?;

        let tables = template
            .fields
            .iter()
            .flat_map(|f| f.tables().iter().cloned())
            .collect();
        let aggregate = template.metric || template.fields.iter().any(Field::is_aggregate);

        Ok(Field::new(id.to_string(), expression, tables, aggregate, codec))
    }

    /// Whether an id has already been declared.
    pub fn is_declared(&self, id: &str) -> bool {
        self.used_ids.contains(id)
    }

    fn claim(&mut self, id: &str) -> ModelResult<()> {
        if !self.used_ids.insert(id.to_string()) {
            return Err(ModelError::DuplicateId(id.to_string()));
        }
        Ok(())
    }
}
