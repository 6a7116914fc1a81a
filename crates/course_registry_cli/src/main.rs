//! Command-line entry point for course registration records.
//!
//! # Responsibility
//! - Map subcommands onto `RegistrationStore` operations.
//! - Print results as JSON on stdout; errors go to stderr with exit code 1.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use course_registry_core::db::open_db;
use course_registry_core::{
    init_logging, NewRegistration, RegistrationPatch, RegistrationStore, RegistryConfig,
    SqliteDocumentStore,
};
use serde_json::json;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "course-registry", version, about = "Manage course registrations")]
struct Cli {
    /// SQLite database file (overrides COURSE_REGISTRY_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Collection name (overrides COURSE_REGISTRY_COLLECTION)
    #[arg(long, global = true)]
    collection: Option<String>,

    /// Schema profile: enrollment or inquiry (overrides COURSE_REGISTRY_PROFILE)
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Log level (overrides COURSE_REGISTRY_LOG_LEVEL)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Absolute log directory (overrides COURSE_REGISTRY_LOG_DIR)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a participant for a course
    Create {
        #[arg(long)]
        course: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        #[command(flatten)]
        optional: OptionalArgs,
    },
    /// List registrations, newest first
    List {
        /// Only registrations for this exact course name
        #[arg(long)]
        course: Option<String>,
    },
    /// Show one registration
    Get { id: String },
    /// Change selected fields of a registration
    Update {
        id: String,
        #[arg(long)]
        course: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[command(flatten)]
        optional: OptionalArgs,
    },
    /// Permanently remove a registration
    Delete { id: String },
}

#[derive(Args, Debug)]
struct OptionalArgs {
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    age: Option<i64>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    gender: Option<String>,
    #[arg(long)]
    payment_status: Option<String>,
    #[arg(long)]
    privacy_agreed: Option<bool>,
    #[arg(long)]
    purpose: Option<String>,
    #[arg(long)]
    region: Option<String>,
}

fn main() {
    if let Err(err) = run(Cli::parse()) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;
    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, log_dir).context("failed to initialize logging")?;
    }
    log::debug!(
        "event=config_resolved module=cli status=ok collection={} profile={}",
        config.collection,
        config.profile
    );

    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open `{}`", config.db_path.display()))?;
    let service = RegistrationStore::with_collection(
        SqliteDocumentStore::new(&conn),
        config.collection.clone(),
        config.profile,
    );

    let output = match cli.command {
        Command::Create {
            course,
            name,
            phone,
            optional,
        } => {
            let input = NewRegistration {
                course_name: course,
                name,
                phone,
                email: optional.email,
                age: optional.age,
                address: optional.address,
                gender: optional.gender,
                payment_status: optional.payment_status,
                privacy_agreed: optional.privacy_agreed,
                purpose: optional.purpose,
                region: optional.region,
            };
            let created = service.create(&input)?;
            json!({ "success": true, "data": created })
        }
        Command::List { course } => {
            let items = match course {
                Some(course) => service.list_by_course(&course)?,
                None => service.list_all()?,
            };
            json!(items)
        }
        Command::Get { id } => match service.get(&id)? {
            Some(registration) => json!(registration),
            None => anyhow::bail!("registration `{id}` not found"),
        },
        Command::Update {
            id,
            course,
            name,
            phone,
            optional,
        } => {
            let patch = RegistrationPatch {
                course_name: course,
                name,
                phone,
                email: optional.email,
                age: optional.age,
                address: optional.address,
                gender: optional.gender,
                payment_status: optional.payment_status,
                privacy_agreed: optional.privacy_agreed,
                purpose: optional.purpose,
                region: optional.region,
            };
            service.update(&id, &patch)?;
            json!({ "success": true })
        }
        Command::Delete { id } => {
            service.delete(&id)?;
            json!({ "success": true })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn resolve_config(cli: &Cli) -> Result<RegistryConfig> {
    let mut config = RegistryConfig::from_env().context("invalid environment configuration")?;
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    if let Some(collection) = &cli.collection {
        config.set_collection(collection.as_str())?;
    }
    if let Some(profile) = &cli.profile {
        config.set_profile(profile)?;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(dir) = &cli.log_dir {
        config.log_dir = Some(dir.clone());
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;

    #[test]
    fn create_accepts_profile_specific_flags() {
        let cli = Cli::try_parse_from([
            "course-registry",
            "--profile",
            "enrollment",
            "create",
            "--course",
            "Yoga",
            "--name",
            "Kim",
            "--phone",
            "010-1111-2222",
            "--age",
            "31",
            "--privacy-agreed",
            "true",
        ])
        .unwrap();

        assert_eq!(cli.profile.as_deref(), Some("enrollment"));
        match cli.command {
            Command::Create {
                course, optional, ..
            } => {
                assert_eq!(course, "Yoga");
                assert_eq!(optional.age, Some(31));
                assert_eq!(optional.privacy_agreed, Some(true));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn list_course_filter_is_optional() {
        let cli = Cli::try_parse_from(["course-registry", "list"]).unwrap();
        assert!(matches!(cli.command, Command::List { course: None }));

        let cli = Cli::try_parse_from(["course-registry", "list", "--course", "Yoga"]).unwrap();
        assert!(matches!(cli.command, Command::List { course: Some(ref c) } if c == "Yoga"));
    }

    #[test]
    fn create_requires_contact_fields() {
        assert!(Cli::try_parse_from(["course-registry", "create", "--course", "Yoga"]).is_err());
    }
}
