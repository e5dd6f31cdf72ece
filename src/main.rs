mod access;
mod account_types;
mod accounts;
mod cashflow;
mod cli;
mod db;
mod error;
mod fmt;
mod journal;
mod ledger;
mod models;
mod reports;
mod settings;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use cli::{
    AccountsCommands, Cli, Commands, ExportCommands, JournalCommands, ReportCommands, TypesCommands,
    UsersCommands,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init {
            data_dir,
            email,
            name,
            company,
        } => cli::init::run(data_dir, &email, &name, company.as_deref()),
        Commands::Status => cli::status::run(),
        Commands::Types { command } => match command {
            TypesCommands::List => cli::account_types::list(),
            TypesCommands::Add {
                name,
                normal_balance,
                description,
            } => cli::account_types::add(&name, &normal_balance, description.as_deref()),
            TypesCommands::Edit {
                id,
                name,
                description,
                normal_balance,
            } => cli::account_types::edit(id, name.as_deref(), description.as_deref(), normal_balance.as_deref()),
            TypesCommands::Delete { id } => cli::account_types::delete(id),
        },
        Commands::Accounts { command } => match command {
            AccountsCommands::List => cli::accounts::list(),
            AccountsCommands::Tree { from_date, to_date } => {
                cli::accounts::tree(from_date.as_deref(), to_date.as_deref())
            }
            AccountsCommands::Add {
                name,
                account_type,
                code,
                parent,
                description,
                header,
                cash_flow,
            } => cli::accounts::add(cli::accounts::AddArgs {
                name,
                account_type,
                code,
                parent,
                description,
                header,
                cash_flow,
            }),
            AccountsCommands::Edit {
                code,
                name,
                description,
                parent,
                no_parent,
                header,
                cash_flow,
                clear_cash_flow,
            } => cli::accounts::edit(cli::accounts::EditArgs {
                code,
                name,
                description,
                parent,
                no_parent,
                header,
                cash_flow,
                clear_cash_flow,
            }),
            AccountsCommands::Delete { code } => cli::accounts::delete(&code),
            AccountsCommands::NextCode { account_type, parent } => {
                cli::accounts::next_code(&account_type, parent.as_deref())
            }
            AccountsCommands::OpeningBalance {
                code,
                amount,
                as_of,
                clear,
            } => cli::accounts::opening_balance(&code, amount, as_of.as_deref(), clear),
        },
        Commands::Journal { command } => match command {
            JournalCommands::Add {
                date,
                description,
                reference,
                lines,
                attachments,
            } => cli::journal::add(date, description, reference, &lines, &attachments),
            JournalCommands::Edit {
                number,
                date,
                description,
                reference,
                lines,
                attachments,
                detach,
            } => cli::journal::edit(&number, date, description, reference, &lines, &attachments, &detach),
            JournalCommands::Show { number, json } => cli::journal::show(&number, json),
            JournalCommands::List {
                from_date,
                to_date,
                account_type,
                search,
                json,
            } => cli::journal::list(from_date, to_date, account_type, search, json),
            JournalCommands::Reverse { number, date } => cli::journal::reverse(&number, date.as_deref()),
        },
        Commands::Report { command } => cli::report::dispatch(command),
        Commands::Export { command } => match command {
            ExportCommands::TrialBalance {
                from_date,
                to_date,
                output,
            } => cli::export::trial_balance(from_date.as_deref(), to_date.as_deref(), &output),
            ExportCommands::Journal {
                from_date,
                to_date,
                output,
            } => cli::export::journal(from_date.as_deref(), to_date.as_deref(), &output),
        },
        Commands::Users { command } => match command {
            UsersCommands::List => cli::users::list(),
            UsersCommands::Add { email, name, role } => cli::users::add(&email, &name, &role),
            UsersCommands::Role { email, role } => cli::users::set_role(&email, &role),
            UsersCommands::Show { email } => cli::users::show(email.as_deref()),
            UsersCommands::Update {
                email,
                name,
                avatar_url,
                clear_avatar,
            } => cli::users::update(email.as_deref(), name.as_deref(), avatar_url.as_deref(), clear_avatar),
        },
        Commands::Demo => cli::demo::run(),
        Commands::Backup { output } => cli::backup::run(output),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "ledgerly", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
