use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;

mod commands;
mod config;
mod watch;

use commands::SourceFormat;
use config::AppConfig;

pub struct AppContext {
    pub db: mutasi_storage::DbPool,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    /// Root of the content-addressed statement file store.
    pub statements_dir: PathBuf,
    pub config: AppConfig,
}

#[derive(Parser, Debug)]
#[command(name = "mutasi", version, about = "Bank statement import and reconciliation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the data directory and write a default config file
    Init,

    /// Manage bank accounts
    Account {
        #[command(subcommand)]
        command: AccountCommand,
    },

    /// Import a statement file into an account
    Ingest {
        file: PathBuf,

        #[arg(long)]
        account: i64,

        /// Statement year, for files whose dates carry no year
        #[arg(long)]
        year: Option<i32>,

        /// Insert lines the account already has instead of skipping them
        #[arg(long)]
        insert_duplicates: bool,

        #[arg(long, value_enum, default_value_t = SourceFormat::Csv)]
        format: SourceFormat,

        /// Keep a copy of the file in the statement store
        #[arg(long)]
        keep_file: bool,
    },

    /// Parse a statement and report what would be imported
    Preview {
        file: PathBuf,

        #[arg(long)]
        account: i64,

        #[arg(long)]
        year: Option<i32>,

        #[arg(long, value_enum, default_value_t = SourceFormat::Csv)]
        format: SourceFormat,
    },

    /// Run the auto-matcher over an account's unmatched lines
    Match {
        #[arg(long)]
        account: i64,
    },

    /// List statement lines
    Lines {
        #[arg(long)]
        account: i64,

        /// Filter: unmatched, suggested, matched or recorded
        #[arg(long)]
        status: Option<String>,
    },

    /// Accept a suggested match
    Confirm { line: i64 },

    /// Turn down a suggested match
    Reject { line: i64 },

    /// Link a line to an existing business record
    Link {
        line: i64,

        #[arg(long)]
        kind: String,

        #[arg(long)]
        id: i64,
    },

    /// Create a business record from a line and link the two
    Record {
        line: i64,

        #[arg(long)]
        kind: String,
    },

    /// Detach a matched or recorded line
    Unlink { line: i64 },

    /// Delete an unmatched line
    Delete { line: i64 },

    /// Edit a line's fields
    Edit {
        line: i64,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        reference: Option<String>,

        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long)]
        debit: Option<Decimal>,

        #[arg(long)]
        credit: Option<Decimal>,
    },

    /// Delete every unmatched line in a date window
    Clear {
        #[arg(long)]
        account: i64,

        #[arg(long)]
        from: NaiveDate,

        #[arg(long)]
        to: NaiveDate,
    },

    /// Show the running balance over a window
    Ledger {
        #[arg(long)]
        account: i64,

        /// Calendar month, e.g. 2025-02
        #[arg(long)]
        month: Option<String>,

        #[arg(long)]
        from: Option<NaiveDate>,

        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// Manage business records for the matcher
    Candidate {
        #[command(subcommand)]
        command: CandidateCommand,
    },

    /// List statement uploads for an account
    Uploads {
        #[arg(long)]
        account: i64,
    },

    /// Watch a folder and ingest statement files dropped into it
    Watch {
        #[arg(long)]
        account: i64,

        /// Folder to watch; defaults to <data dir>/intake
        #[arg(long)]
        dir: Option<PathBuf>,

        #[arg(long)]
        year: Option<i32>,
    },

    /// Write a tar.gz holding the database and stored statement files
    Backup { dest: PathBuf },
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    /// Add a bank account
    Add {
        name: String,

        #[arg(long, default_value = "IDR")]
        currency: String,

        #[arg(long, default_value = "0")]
        opening: Decimal,

        /// Date the opening balance was taken
        #[arg(long)]
        date: NaiveDate,
    },

    /// List bank accounts
    List,
}

#[derive(Subcommand, Debug)]
enum CandidateCommand {
    /// Add a record by hand
    Add {
        #[arg(long)]
        kind: String,

        #[arg(long)]
        date: NaiveDate,

        #[arg(long)]
        amount: Decimal,

        #[arg(long)]
        memo: Option<String>,
    },

    /// List records of one kind
    List {
        #[arg(long)]
        kind: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let data_dir = config::data_dir()?;
    std::fs::create_dir_all(&data_dir)?;
    let config = config::load_config(&data_dir)?;
    let db_path = config.database_path(&data_dir);
    let statements_dir = config.statements_path(&data_dir);
    std::fs::create_dir_all(&statements_dir)?;

    let db = mutasi_storage::create_db(&db_path).await?;
    let ctx = AppContext {
        db,
        data_dir,
        db_path,
        statements_dir,
        config,
    };

    match cli.command {
        Command::Init => commands::init(&ctx),

        Command::Account { command } => match command {
            AccountCommand::Add {
                name,
                currency,
                opening,
                date,
            } => commands::account_add(&ctx, &name, &currency, opening, date).await,
            AccountCommand::List => commands::account_list(&ctx).await,
        },

        Command::Ingest {
            file,
            account,
            year,
            insert_duplicates,
            format,
            keep_file,
        } => {
            commands::ingest(&ctx, &file, account, year, insert_duplicates, format, keep_file)
                .await
        }

        Command::Preview {
            file,
            account,
            year,
            format,
        } => commands::preview(&ctx, &file, account, year, format).await,

        Command::Match { account } => commands::run_match(&ctx, account).await,

        Command::Lines { account, status } => {
            commands::lines(&ctx, account, status.as_deref()).await
        }

        Command::Confirm { line } => commands::confirm(&ctx, line).await,
        Command::Reject { line } => commands::reject(&ctx, line).await,
        Command::Link { line, kind, id } => commands::link(&ctx, line, &kind, id).await,
        Command::Record { line, kind } => commands::record(&ctx, line, &kind).await,
        Command::Unlink { line } => commands::unlink(&ctx, line).await,
        Command::Delete { line } => commands::delete(&ctx, line).await,

        Command::Edit {
            line,
            description,
            reference,
            date,
            debit,
            credit,
        } => commands::edit(&ctx, line, description, reference, date, debit, credit).await,

        Command::Clear { account, from, to } => commands::clear(&ctx, account, from, to).await,

        Command::Ledger {
            account,
            month,
            from,
            to,
        } => {
            let window = commands::resolve_window(month.as_deref(), from, to)?;
            commands::ledger(&ctx, account, window).await
        }

        Command::Candidate { command } => match command {
            CandidateCommand::Add {
                kind,
                date,
                amount,
                memo,
            } => commands::candidate_add(&ctx, &kind, date, amount, memo.as_deref()).await,
            CandidateCommand::List { kind } => commands::candidate_list(&ctx, &kind).await,
        },

        Command::Uploads { account } => commands::uploads(&ctx, account).await,

        Command::Watch { account, dir, year } => {
            let dir = dir.unwrap_or_else(|| ctx.data_dir.join("intake"));
            watch::run(&ctx, account, &dir, year).await
        }

        Command::Backup { dest } => commands::backup(&ctx, &dest).await,
    }
}
