use clap::{Subcommand, ValueEnum};
use planner::query::dialect::DialectKind;

#[derive(Subcommand)]
pub enum Commands {
    /// Run one synchronization request and print its result as JSON
    Run {
        #[arg(long, help = "Run request file (JSON)")]
        request: String,

        #[arg(long, help = "Optional .env file layered over the process environment")]
        env_file: Option<String>,
    },
    /// Print the column correspondence and statements of every table mapping
    Validate {
        #[arg(long, help = "Run request file (JSON)")]
        request: String,

        #[arg(long, value_enum, default_value_t = DialectArg::Postgres)]
        source_dialect: DialectArg,

        #[arg(long, value_enum, default_value_t = DialectArg::Postgres)]
        target_dialect: DialectArg,
    },
    /// Connect to a database URL and run `SELECT 1`
    TestConn {
        /// postgres://, postgresql://, mysql:// or mariadb:// URL
        #[arg(long)]
        url: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DialectArg {
    Postgres,
    Mysql,
}

impl From<DialectArg> for DialectKind {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Postgres => DialectKind::Postgres,
            DialectArg::Mysql => DialectKind::MySql,
        }
    }
}
