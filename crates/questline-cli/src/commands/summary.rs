use clap::Subcommand;
use questline_core::Database;

#[derive(Subcommand)]
pub enum SummaryAction {
    /// List archived sessions, newest first
    List {
        /// Show at most this many
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print the full summary of one session
    Show {
        session_id: String,
    },
}

pub fn run(action: SummaryAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    match action {
        SummaryAction::List { limit } => {
            let records = db.list_summaries(limit)?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        SummaryAction::Show { session_id } => match db.get_summary(&session_id)? {
            Some(summary) => println!("{}", serde_json::to_string_pretty(&summary)?),
            None => return Err(format!("no summary for session '{session_id}'").into()),
        },
    }
    Ok(())
}
