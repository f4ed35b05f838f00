use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tracing::info;

use tutor_portal::model::Session;
use tutor_portal::months;
use tutor_portal::summary;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Summarize a saved sessions payload without contacting the backend"
)]
struct Args {
    /// JSON file: a list of sessions or a `{"sessions": [...]}` response
    #[arg(long)]
    file: PathBuf,

    /// Only this calendar month (1-12)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    month: Option<u32>,

    /// Count general exams in attendance and quiz figures
    #[arg(long)]
    include_general_exams: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let raw = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let payload: Value = serde_json::from_str(&raw).context("file is not valid JSON")?;
    let records = match &payload {
        Value::Array(items) => items.as_slice(),
        other => other
            .get("sessions")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default(),
    };
    let sessions: Vec<Session> = records.iter().map(Session::from_json).collect();
    info!(count = sessions.len(), "sessions loaded");

    let available: Vec<String> = months::available_months(&sessions)
        .into_iter()
        .map(|m| m.to_string())
        .collect();
    println!("months with data: [{}]", available.join(", "));

    let selected = months::filter_by_month(&sessions, args.month);
    let exams = selected.iter().filter(|s| s.is_general_exam()).count();
    let sum = summary::summarize(selected.iter().copied(), !args.include_general_exams);
    println!("{}", serde_json::to_string_pretty(&sum)?);
    println!("general exams in selection: {exams}");
    if let Some(g) = summary::general_exam_grade(selected.iter().copied()) {
        println!("{}: {}/{}", g.label, g.score, g.total);
    }
    Ok(())
}
