use crate::query::{
    ast::update::{Assignment, Update},
    renderer::{Render, Renderer},
};

impl Render for Update {
    fn render(&self, r: &mut Renderer) {
        r.sql.push_str("UPDATE ");
        r.sql.push_str(&self.table);
        r.sql.push_str(" SET ");
        r.push_list(&self.assignments);

        if let Some(condition) = &self.where_clause {
            r.sql.push_str(" WHERE ");
            condition.render(r);
        }
    }
}

impl Render for Assignment {
    fn render(&self, r: &mut Renderer) {
        r.sql.push_str(&self.column);
        r.sql.push_str(" = ");
        self.value.render(r);
    }
}
