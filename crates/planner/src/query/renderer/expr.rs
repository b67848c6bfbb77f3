use crate::query::{
    ast::expr::{BinaryOp, Expr},
    renderer::{Render, Renderer},
};

impl Render for Expr {
    fn render(&self, r: &mut Renderer) {
        match self {
            Expr::Identifier(name) => r.sql.push_str(name),
            Expr::Value(value) => r.add_param(value.clone()),
            Expr::Placeholder => r.add_placeholder(),
            Expr::Literal(sql) => r.sql.push_str(sql),
            Expr::BinaryOp(op) => op.render(r),
        }
    }
}

impl Render for BinaryOp {
    fn render(&self, r: &mut Renderer) {
        self.left.render(r);
        r.sql.push(' ');
        r.sql.push_str(self.op.as_sql());
        r.sql.push(' ');
        self.right.render(r);
    }
}
