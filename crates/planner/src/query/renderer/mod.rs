//! Defines the core rendering trait and context for converting AST to SQL.

use model::core::value::Value;

use crate::query::dialect::Dialect;

pub mod expr;
pub mod insert;
pub mod select;
pub mod update;

/// A trait for any AST node that can be rendered into a SQL string.
pub trait Render {
    fn render(&self, renderer: &mut Renderer);
}

/// A context that holds the state during the rendering process.
///
/// It accumulates the SQL string and the parameters, and provides
/// access to the dialect for syntax-specific details.
pub struct Renderer<'a> {
    pub sql: String,
    pub params: Vec<Value>,
    pub dialect: &'a dyn Dialect,
    placeholders: usize,
}

impl<'a> Renderer<'a> {
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self {
            sql: String::new(),
            params: Vec::new(),
            dialect,
            placeholders: 0,
        }
    }

    /// Consumes the renderer and returns the final SQL string and parameters.
    pub fn finish(self) -> (String, Vec<Value>) {
        (self.sql, self.params)
    }

    pub fn add_param(&mut self, value: Value) {
        self.params.push(value);
        self.add_placeholder();
    }

    /// Emits the next positional placeholder without recording a value.
    pub fn add_placeholder(&mut self) {
        let placeholder = self.dialect.get_placeholder(self.placeholders);
        self.placeholders += 1;
        self.sql.push_str(&placeholder);
    }

    pub fn push_list<T: Render>(&mut self, items: &[T]) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            item.render(self);
        }
    }
}
