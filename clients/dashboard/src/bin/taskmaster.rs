use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use taskmaster_atoms::tasks::validate::parse_due_date;
use taskmaster_dashboard::{
    render, ClientError, Dashboard, HttpTaskApi, Session, SortDirection, TaskChanges, TaskDraft,
    TaskStatus,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "taskmaster", version, about = "Manage your TaskMaster tasks from the terminal")]
struct Cli {
    /// Base URL of the TaskMaster API
    #[arg(long, env = "TASKMASTER_API_URL")]
    api_url: String,

    /// Bearer access token for the signed-in user
    #[arg(long, env = "TASKMASTER_TOKEN", hide_env_values = true)]
    token: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List tasks, filtered by status and sorted by due date
    List {
        /// Only show these statuses (repeatable)
        #[arg(long = "status")]
        statuses: Vec<TaskStatus>,
        /// Latest due date first
        #[arg(long)]
        desc: bool,
    },
    /// Create a task
    Add {
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, default_value = "To Do")]
        status: TaskStatus,
        /// YYYY-MM-DD or RFC 3339
        #[arg(long, value_parser = due_date_arg)]
        due: Option<DateTime<Utc>>,
    },
    /// Edit fields of an existing task
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_parser = due_date_arg, conflicts_with = "clear_due")]
        due: Option<DateTime<Utc>>,
        #[arg(long)]
        clear_due: bool,
    },
    /// Move a task to another status
    Status { id: String, status: TaskStatus },
    /// Delete a task
    Delete { id: String },
    /// Show the signed-in account
    Whoami,
}

fn due_date_arg(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_due_date(raw).ok_or_else(|| format!("'{}' is not a YYYY-MM-DD date or RFC 3339 time", raw))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let session = match Session::start(cli.token) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let mut dashboard = Dashboard::new(HttpTaskApi::new(cli.api_url), session);

    let result = run(&mut dashboard, cli.command).await;

    for notice in dashboard.take_notices() {
        eprintln!("{}", render::notice(&notice));
    }
    dashboard.sign_out();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("command failed: {:?}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(dashboard: &mut Dashboard<HttpTaskApi>, command: Command) -> Result<(), ClientError> {
    match command {
        Command::List { statuses, desc } => {
            // Profile is cosmetic; a missing one should not block the listing.
            if let Err(e) = dashboard.load_profile().await {
                tracing::info!("No profile loaded: {}", e);
            }
            dashboard.refresh().await?;
            let view = dashboard.view_mut();
            view.show_only(&statuses);
            if desc {
                view.set_sort(SortDirection::Descending);
            }
            println!("{}\n", render::header(dashboard.session(), dashboard.view()));
            println!("{}", render::task_list(&dashboard.view().derived()));
        }
        Command::Add {
            title,
            description,
            status,
            due,
        } => {
            let task = dashboard
                .create(TaskDraft {
                    title,
                    description,
                    status,
                    due_date: due,
                })
                .await?;
            println!("{}", render::task_card(&task));
        }
        Command::Edit {
            id,
            title,
            description,
            due,
            clear_due,
        } => {
            let changes = TaskChanges {
                title,
                description: description.map(Some),
                status: None,
                due_date: if clear_due { Some(None) } else { due.map(Some) },
            };
            dashboard.edit(&id, changes).await?;
            if let Some(task) = dashboard.view().task(&id) {
                println!("{}", render::task_card(task));
            }
        }
        Command::Status { id, status } => {
            dashboard.refresh().await?;
            dashboard.change_status(&id, status).await?;
            if let Some(task) = dashboard.view().task(&id) {
                println!("{}", render::task_card(task));
            }
        }
        Command::Delete { id } => {
            dashboard.refresh().await?;
            dashboard.delete(&id).await?;
        }
        Command::Whoami => {
            dashboard.load_profile().await?;
            println!("{}", render::header(dashboard.session(), dashboard.view()));
        }
    }
    Ok(())
}
