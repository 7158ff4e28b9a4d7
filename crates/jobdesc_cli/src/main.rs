//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `jobdesc_core` linkage and configuration loading.
//! - Open the configured database and print one line per stored version.
//!
//! Configuration comes from `JOBDESC_*` environment variables; see
//! `jobdesc_core::config`.

use jobdesc_core::db::open_db;
use jobdesc_core::{
    init_logging_from_config, CoreConfig, JobDescriptionListQuery, JobDescriptionService,
    NoopAuditSink, SqliteJobDescriptionRepository,
};
use log::error;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("jobdesc_core ping={}", jobdesc_core::ping());
    println!("jobdesc_core version={}", jobdesc_core::core_version());

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_run module=cli status=error error={message}");
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config = CoreConfig::from_env().map_err(|err| err.to_string())?;
    init_logging_from_config(&config).map_err(|err| err.to_string())?;

    let conn = open_db(&config.db_path).map_err(|err| err.to_string())?;
    let repo = SqliteJobDescriptionRepository::new(&conn);
    let service =
        JobDescriptionService::new(repo, NoopAuditSink).with_policy(config.child_write_policy);

    let summaries = service
        .list(&JobDescriptionListQuery::default())
        .map_err(|err| err.to_string())?;
    println!(
        "db={} job_descriptions={}",
        config.db_path.display(),
        summaries.len()
    );
    for summary in summaries {
        println!(
            "{} v{} {} [{}] {}/{} {}",
            summary.id,
            summary.version,
            summary.status.as_str(),
            summary.job_band.as_str(),
            summary.job_grade,
            summary.department_name.as_deref().unwrap_or("-"),
            summary.position
        );
    }
    Ok(())
}
