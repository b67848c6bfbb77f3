use crate::query::{
    ast::insert::{ConflictAction, Insert, OnConflict},
    renderer::{Render, Renderer},
};

impl Render for Insert {
    fn render(&self, r: &mut Renderer) {
        // 1. INSERT INTO table (...)
        r.sql.push_str("INSERT INTO ");
        r.sql.push_str(&self.table);
        r.sql.push_str(" (");
        r.sql.push_str(&self.columns.join(", "));
        r.sql.push(')');

        // 2. VALUES (...)
        render_values(self, r);

        if let Some(on_conflict) = &self.on_conflict {
            render_on_conflict(on_conflict, r);
        }
    }
}

fn render_values(insert: &Insert, r: &mut Renderer) {
    r.sql.push_str(" VALUES ");
    for (i, row) in insert.values.iter().enumerate() {
        if i > 0 {
            r.sql.push_str(", ");
        }
        r.sql.push('(');
        r.push_list(row);
        r.sql.push(')');
    }
}

fn render_on_conflict(on_conflict: &OnConflict, r: &mut Renderer) {
    if on_conflict.columns.is_empty() {
        return;
    }

    let assignments = match &on_conflict.action {
        ConflictAction::DoUpdate { columns } if !columns.is_empty() => columns.clone(),
        // Re-assigning the key leaves the existing row untouched on every dialect.
        _ => on_conflict.columns.clone(),
    };

    r.sql.push_str(&r.dialect.upsert_clause(&on_conflict.columns));
    for (i, column) in assignments.iter().enumerate() {
        if i > 0 {
            r.sql.push_str(", ");
        }
        r.sql.push_str(column);
        r.sql.push_str(" = ");
        r.sql.push_str(&r.dialect.excluded_value(column));
    }
}

#[cfg(test)]
mod tests {
    use model::core::value::Value;

    use crate::query::{
        ast::{
            expr::Expr,
            insert::{ConflictAction, Insert, OnConflict},
        },
        dialect::{MySql, Postgres},
        renderer::{Render, Renderer},
    };

    fn value(val: Value) -> Expr {
        Expr::Value(val)
    }

    #[test]
    fn test_render_batch_insert_postgres() {
        let ast = Insert {
            table: "users".to_string(),
            columns: vec!["name".to_string(), "is_active".to_string()],
            values: vec![
                vec![
                    value(Value::String("Alice".to_string())),
                    value(Value::Boolean(true)),
                ],
                vec![
                    value(Value::String("Bob".to_string())),
                    value(Value::Boolean(false)),
                ],
            ],
            on_conflict: None,
        };

        let mut renderer = Renderer::new(&Postgres);
        ast.render(&mut renderer);
        let (sql, params) = renderer.finish();

        assert_eq!(
            sql,
            "INSERT INTO users (name, is_active) VALUES ($1, $2), ($3, $4)"
        );
        assert_eq!(
            params,
            vec![
                Value::String("Alice".to_string()),
                Value::Boolean(true),
                Value::String("Bob".to_string()),
                Value::Boolean(false)
            ]
        );
    }

    #[test]
    fn test_render_upsert_postgres() {
        let ast = Insert {
            table: "users".to_string(),
            columns: vec!["id".to_string(), "name".to_string()],
            values: vec![vec![Expr::Placeholder, Expr::Placeholder]],
            on_conflict: Some(OnConflict {
                columns: vec!["id".to_string()],
                action: ConflictAction::DoUpdate {
                    columns: vec!["name".to_string()],
                },
            }),
        };

        let mut renderer = Renderer::new(&Postgres);
        ast.render(&mut renderer);
        let (sql, _) = renderer.finish();

        assert_eq!(
            sql,
            "INSERT INTO users (id, name) VALUES ($1, $2) ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name"
        );
    }

    #[test]
    fn test_render_upsert_key_only_mysql() {
        let ast = Insert {
            table: "users".to_string(),
            columns: vec!["id".to_string()],
            values: vec![vec![Expr::Placeholder]],
            on_conflict: Some(OnConflict {
                columns: vec!["id".to_string()],
                action: ConflictAction::DoNothing,
            }),
        };

        let mut renderer = Renderer::new(&MySql);
        ast.render(&mut renderer);
        let (sql, _) = renderer.finish();

        assert_eq!(
            sql,
            "INSERT INTO users (id) VALUES (?) ON DUPLICATE KEY UPDATE id = VALUES(id)"
        );
    }
}
