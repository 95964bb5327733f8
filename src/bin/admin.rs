//! Portfolio admin - command-line stand-in for the admin panel

use anyhow::{anyhow, Context};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;

use portfolio::{
    config::{AdminArgs, AdminCommand},
    logging,
    service::CommitOutcome,
    FileSnapshotStore, InMemoryRemote, PortfolioDataService, ProxyClient, RemoteDocumentClient,
    Snapshot, Week,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let args = AdminArgs::parse();
    logging::init(&args.log_level, false);

    let local = Arc::new(FileSnapshotStore::new(&args.data_dir));

    if args.offline {
        let remote = Arc::new(InMemoryRemote::new());
        execute(PortfolioDataService::new(remote, local), args.command).await
    } else {
        let remote = Arc::new(ProxyClient::new(args.proxy_client_config())?);
        execute(PortfolioDataService::new(remote, local), args.command).await
    }
}

async fn execute<R: RemoteDocumentClient>(
    mut service: PortfolioDataService<R, FileSnapshotStore>,
    command: AdminCommand,
) -> anyhow::Result<()> {
    let loaded = service.load().await;
    eprintln!("Loaded snapshot from {} storage", loaded.source);

    match command {
        AdminCommand::Show { json } => {
            if json {
                let bytes = service.snapshot().to_pretty_json()?;
                println!("{}", String::from_utf8_lossy(&bytes));
            } else {
                print_snapshot(service.snapshot());
            }
            Ok(())
        }
        AdminCommand::SetMeta {
            week,
            title,
            description,
        } => {
            let (title, description) =
                merged_meta(service.snapshot().week(week)?, title, description);
            service.set_week_meta(week, &title, &description)?;
            report(service.commit().await)
        }
        AdminCommand::Add {
            week,
            file,
            media_type,
        } => {
            let file_name = file
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| anyhow!("{} has no usable file name", file.display()))?
                .to_string();
            let media_type = media_type.unwrap_or_else(|| declared_media_type(&file).to_string());
            let content = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;

            let receipt = service
                .add_activity(week, &file_name, &media_type, &content)
                .await?;
            println!(
                "Added \"{}\" to week {} ({})",
                receipt.value.name, week, receipt.value.url
            );
            report(receipt.commit)
        }
        AdminCommand::Remove { week, index } => {
            let receipt = service.remove_activity(week, index).await?;
            println!("Removed \"{}\" from week {}", receipt.value.name, week);
            report(receipt.commit)
        }
    }
}

/// Media type a browser would declare for the file, judged by extension
fn declared_media_type(file: &Path) -> &'static str {
    match file.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Fill flags that were not given from the week's current values
fn merged_meta(
    current: &Week,
    title: Option<String>,
    description: Option<String>,
) -> (String, String) {
    (
        title.unwrap_or_else(|| current.title.clone()),
        description.unwrap_or_else(|| current.description.clone()),
    )
}

fn report(outcome: CommitOutcome) -> anyhow::Result<()> {
    if !outcome.mirrored {
        eprintln!("warning: local mirror was not updated");
    }
    match outcome.error {
        None => {
            println!("Changes saved");
            Ok(())
        }
        Some(e) => Err(anyhow!("changes were NOT saved remotely: {}", e)),
    }
}

fn print_snapshot(snapshot: &Snapshot) {
    for week in &snapshot.weeks {
        let title = if week.title.is_empty() {
            "(untitled)"
        } else {
            week.title.as_str()
        };
        println!("WEEK {:>2}  {}", week.number, title);

        if week.is_empty() {
            println!("          no content yet");
            continue;
        }
        if !week.description.is_empty() {
            println!("          {}", week.description);
        }
        for (i, activity) in week.activities.iter().enumerate() {
            println!("          [{}] {} -> {}", i, activity.name, activity.url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merged_meta_keeps_omitted_fields() {
        let mut week = Week::empty(3);
        week.title = "Normalization".into();
        week.description = "1NF to BCNF".into();

        let (title, description) = merged_meta(&week, None, Some("Updated".into()));
        assert_eq!(title, "Normalization");
        assert_eq!(description, "Updated");

        let (title, description) = merged_meta(&week, Some(String::new()), None);
        assert_eq!(title, "");
        assert_eq!(description, "1NF to BCNF");
    }

    #[test]
    fn test_declared_media_type_by_extension() {
        assert_eq!(declared_media_type(Path::new("a/Report.PDF")), "application/pdf");
        assert_eq!(declared_media_type(Path::new("notes.txt")), "application/octet-stream");
    }
}
