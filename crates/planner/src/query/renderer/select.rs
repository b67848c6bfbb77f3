use crate::query::{
    ast::select::Select,
    renderer::{Render, Renderer},
};

impl Render for Select {
    fn render(&self, r: &mut Renderer) {
        r.sql.push_str("SELECT ");
        r.push_list(&self.columns);
        r.sql.push_str(" FROM ");
        r.sql.push_str(&self.from);

        if let Some(condition) = &self.where_clause {
            r.sql.push_str(" WHERE ");
            condition.render(r);
        }
    }
}
