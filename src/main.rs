use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use tutor_portal::auth::{self, Account, Role};
use tutor_portal::config::{self, Config};
use tutor_portal::dashboard::{self, DashboardView, ParentDashboard};
use tutor_portal::months;
use tutor_portal::phone;
use tutor_portal::portal::{PortalApi, PortalClient};
use tutor_portal::upload::{self, UploadRequest};

#[derive(Debug, Parser)]
#[command(author, version, about = "Parent and admin views over the tutoring backend")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check credentials and report whether a password reset is pending
    Login {
        /// Parent phone number, or admin username with --admin
        identifier: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        admin: bool,
    },
    /// Replace a parent's default password after the first login
    ResetPassword {
        #[arg(long)]
        phone: String,
        #[arg(long)]
        new_password: String,
    },
    ChangePassword {
        /// Parent phone number, or admin username with --admin
        identifier: String,
        #[arg(long)]
        current_password: String,
        #[arg(long)]
        new_password: String,
        #[arg(long)]
        admin: bool,
    },
    /// List a parent's children
    Students {
        /// Parent phone number, any common format
        #[arg(long)]
        phone: String,
        #[arg(long)]
        password: String,
    },
    /// Show a child's sessions and summary
    Sessions {
        #[arg(long)]
        phone: String,
        #[arg(long)]
        password: String,
        /// Combined id, backend id or name; defaults to the first child
        #[arg(long)]
        student: Option<String>,
        /// Calendar month 1-12
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
        /// Count general exams in attendance and quiz figures
        #[arg(long)]
        include_general_exams: bool,
        /// Print the view as JSON
        #[arg(long)]
        json: bool,
    },
    /// Admin statistics over all students
    Overview {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        json: bool,
    },
    /// List upload groups known to the backend
    Groups,
    /// Forward an Excel session sheet to the backend
    Upload {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        session: u32,
        #[arg(long)]
        group: String,
        #[arg(long)]
        general_exam: bool,
        #[arg(long)]
        quiz_mark: Option<f64>,
        #[arg(long)]
        finish_time: Option<String>,
        #[arg(long)]
        lecture_name: Option<String>,
        #[arg(long)]
        exam_name: Option<String>,
        /// Hide exam grades from parents
        #[arg(long)]
        no_exam_grade: bool,
        /// Hide payments from parents
        #[arg(long)]
        no_payment: bool,
        /// Hide finish time from parents
        #[arg(long)]
        no_time: bool,
    },
    /// Print the normalized form of a phone number
    Normalize { raw: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    match args.command {
        Command::Normalize { raw } => {
            println!("{}", phone::normalize(&raw));
        }
        Command::Login {
            identifier,
            password,
            admin,
        } => {
            let (_, client) = connect(&args.config)?;
            let role = if admin { Role::Admin } else { Role::Parent };
            let account = auth::sign_in(&client, role, &identifier, &password).await?;
            println!("Signed in as {} ({})", display_name(&account), account.identifier);
            if account.needs_password_reset {
                println!("Password reset required: run `reset-password` before using the dashboard");
            }
        }
        Command::ResetPassword { phone, new_password } => {
            let (_, client) = connect(&args.config)?;
            auth::reset_password(&client, &phone, &new_password).await?;
            println!("Password updated");
        }
        Command::ChangePassword {
            identifier,
            current_password,
            new_password,
            admin,
        } => {
            let (_, client) = connect(&args.config)?;
            let role = if admin { Role::Admin } else { Role::Parent };
            auth::change_password(&client, role, &identifier, &current_password, &new_password).await?;
            println!("Password changed");
        }
        Command::Students { phone, password } => {
            let (cfg, client) = connect(&args.config)?;
            sign_in_parent(&client, &phone, &password).await?;
            let dash = ParentDashboard::new(client, cfg.dashboard.exclude_general_exams);
            let students = dash.load_students(&phone).await;
            if students.is_empty() {
                println!("No students found for {}", phone::normalize(&phone));
            }
            for s in students {
                let ids: Vec<&str> = s.ids.iter().map(String::as_str).collect();
                println!("{}  {}  [{}]", s.combined_id, s.name, ids.join(", "));
            }
        }
        Command::Sessions {
            phone,
            password,
            student,
            month,
            include_general_exams,
            json,
        } => {
            let (cfg, client) = connect(&args.config)?;
            sign_in_parent(&client, &phone, &password).await?;
            let exclude = cfg.dashboard.exclude_general_exams && !include_general_exams;
            let dash = ParentDashboard::new(client, exclude);
            let students = dash.load_students(&phone).await;
            if let Some(key) = student.as_deref() {
                if !dash.select_student(key).await {
                    let known: Vec<&str> = students.iter().map(|s| s.combined_id.as_str()).collect();
                    bail!("unknown student {key:?}; known: {}", known.join(", "));
                }
            }
            dash.select_month(month).await;
            let view = dash.view().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print_view(&view);
            }
        }
        Command::Overview {
            username,
            password,
            json,
        } => {
            let (_, client) = connect(&args.config)?;
            auth::sign_in(&client, Role::Admin, &username, &password).await?;
            let view = dashboard::admin_view(&client).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
                return Ok(());
            }
            let o = &view.overview;
            println!("Students:            {}", o.total_students);
            println!("Average attendance:  {}%", o.average_attendance);
            println!("Average quiz score:  {}%", o.average_quiz_score);
            println!("Total paid:          {}", o.total_paid);
            for row in &view.rows {
                println!(
                    "{:<12} {:<24} attendance {:>5.1}% ({})  quizzes {:>5.1} ({})  paid {}/{} ({})",
                    row.student.id,
                    row.student.name,
                    row.student.attendance,
                    row.attendance_band.as_str(),
                    row.student.quizzes.average,
                    row.score_band.as_str(),
                    row.student.payments.paid,
                    row.student.payments.total,
                    row.payment_band.as_str(),
                );
            }
        }
        Command::Groups => {
            let (_, client) = connect(&args.config)?;
            for g in client.groups().await? {
                println!("{g}");
            }
        }
        Command::Upload {
            username,
            password,
            file,
            session,
            group,
            general_exam,
            quiz_mark,
            finish_time,
            lecture_name,
            exam_name,
            no_exam_grade,
            no_payment,
            no_time,
        } => {
            let (cfg, client) = connect(&args.config)?;
            auth::sign_in(&client, Role::Admin, &username, &password).await?;
            let mut req = UploadRequest::new(file, session, group);
            req.is_general_exam = general_exam;
            req.quiz_mark = quiz_mark;
            req.finish_time = finish_time;
            req.lecture_name = lecture_name;
            req.exam_name = exam_name;
            req.has_exam_grade = !no_exam_grade;
            req.has_payment = !no_payment;
            req.has_time = !no_time;
            req.validate(&upload::backend_settings(&client, &cfg.upload).await)?;

            let resp = client.upload_excel(&req).await?;
            println!(
                "{} ({} of {} records)",
                if resp.message.is_empty() { "Upload finished" } else { resp.message.as_str() },
                resp.updated_count,
                resp.total_records
            );
            for err in &resp.errors {
                println!("  error: {err}");
            }
        }
    }

    Ok(())
}

fn connect(path: &Path) -> Result<(Config, PortalClient)> {
    let cfg = config::load(Some(path))?;
    let client = PortalClient::from_config(&cfg)?;
    info!(base_url = %client.base_url(), "using backend");
    Ok((cfg, client))
}

async fn sign_in_parent(client: &PortalClient, phone: &str, password: &str) -> Result<Account> {
    let account = auth::sign_in(client, Role::Parent, phone, password).await?;
    account.ensure_ready()?;
    Ok(account)
}

fn display_name(account: &Account) -> &str {
    if account.name.is_empty() {
        &account.identifier
    } else {
        &account.name
    }
}

fn print_view(view: &DashboardView) {
    let Some(student) = &view.student else {
        println!("No data");
        return;
    };
    println!("{} ({})", student.name, student.combined_id);
    let months: Vec<&str> = view
        .available_months
        .iter()
        .filter_map(|m| months::month_name(*m))
        .collect();
    println!("Months with data: {}", if months.is_empty() { "-".to_string() } else { months.join(", ") });
    if let Some(m) = view.selected_month.and_then(months::month_name) {
        println!("Showing: {m}");
    }
    if view.sessions.is_empty() {
        println!("No sessions");
    }
    for s in &view.sessions {
        let exam = if s.is_general_exam() { " [general exam]" } else { "" };
        println!(
            "  {:<32} {:<10} quiz {}/{}  homework {:<9}  paid {}  {}{}",
            s.name,
            s.attendance.as_str(),
            s.quiz_correct,
            s.quiz_denominator(),
            s.homework_status.as_str(),
            s.payment,
            s.date,
            exam
        );
    }
    let sum = &view.summary;
    println!(
        "Sessions {}  attended {}  missed {}  attendance {}%",
        sum.session_count, sum.attended_count, sum.missed_count, sum.attendance_percentage
    );
    println!(
        "Quizzes {}/{} ({}%)  payments {}",
        sum.quiz_correct_total, sum.quiz_possible_total, sum.quiz_percentage, sum.payment_total
    );
    if let Some(g) = &view.general_exam {
        println!("{}: {}/{}", g.label, g.score, g.total);
    }
}
