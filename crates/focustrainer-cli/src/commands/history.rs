use chrono::NaiveDate;
use clap::Subcommand;
use focustrainer_core::{Database, DistractionKind, Reflection, ReflectionQuality};

use super::print_json;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List recorded focus sessions, newest first
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Only sessions ending on this UTC day (YYYY-MM-DD), oldest first
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Show one recorded session
    Show {
        /// Record id
        id: String,
    },
    /// Attach a reflection to a recorded session
    Reflect {
        /// Record id
        id: String,
        /// great, okay or struggled
        #[arg(long)]
        quality: ReflectionQuality,
        /// Distraction that cost the most
        #[arg(long)]
        biggest: Option<DistractionKind>,
        #[arg(long, default_value = "")]
        note: String,
    },
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        HistoryAction::List { limit, date } => {
            let records = match date {
                Some(date) => db.records_on(date)?,
                None => db.list_records(limit)?,
            };
            print_json(&records)?;
        }
        HistoryAction::Show { id } => {
            let record = db
                .get_record(&id)?
                .ok_or_else(|| format!("session not found: {id}"))?;
            print_json(&record)?;
        }
        HistoryAction::Reflect {
            id,
            quality,
            biggest,
            note,
        } => {
            let reflection = Reflection {
                quality,
                biggest_distraction: biggest,
                note,
            };
            if !db.set_reflection(&id, &reflection)? {
                return Err(match db.get_record(&id)? {
                    Some(_) => format!("session already has a reflection: {id}"),
                    None => format!("session not found: {id}"),
                }
                .into());
            }
            let record = db
                .get_record(&id)?
                .ok_or_else(|| format!("session not found: {id}"))?;
            print_json(&record)?;
        }
    }
    Ok(())
}
