// src/main.rs
//
// Command-line driver.
//
// Long operations start a background task and are followed by polling the
// task status every second until `is_running` is false.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use postkeeper::application::{self, AppState, ListPostsDto, PostDto, UpdateConfigDto};
use postkeeper::StoreLayout;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(name = "postkeeper")]
#[command(about = "Archive social media posts referenced from Markdown notes")]
#[command(version)]
struct Cli {
    /// Archive directory (defaults to the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan notes for post URLs and add new ones as pending stubs
    Scan {
        /// Notes directory (defaults to the configured source_dir)
        source_dir: Option<String>,
    },

    /// Check reachability (all pending/error posts, or the given ids)
    Validate { ids: Vec<String> },

    /// Fetch metadata (all accessible unscraped posts, or the given ids)
    Scrape { ids: Vec<String> },

    /// Download media (all scraped posts without media, or the given ids)
    Download { ids: Vec<String> },

    /// Scan, then validate, then scrape
    Run {
        source_dir: Option<String>,

        /// Also download media at the end
        #[arg(long)]
        download: bool,
    },

    /// List posts
    List {
        #[arg(long, value_delimiter = ',')]
        status: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        platform: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        author: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        media_type: Vec<String>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        search: Option<String>,
        /// scraped_at | posted_at | likes | views
        #[arg(long)]
        sort: Option<String>,
        /// Ascending order (default is descending)
        #[arg(long)]
        asc: bool,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        offset: Option<usize>,
        /// Only private and deleted posts
        #[arg(long, conflicts_with_all = ["status", "platform", "author", "media_type", "tag", "search"])]
        inaccessible: bool,
    },

    /// Show one post
    Show { id: String },

    /// Edit tags
    Tag {
        id: String,
        #[command(subcommand)]
        action: TagAction,
    },

    /// Set or clear the note on a post
    Note {
        id: String,
        /// Omit to clear the note
        text: Option<String>,
    },

    /// Delete posts together with their media
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Archive statistics
    Stats,

    /// Rebuild the derived index
    Reindex,

    /// Show or change configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Reveal a post's media in the file manager
    Open { id: String },
}

#[derive(Subcommand)]
enum TagAction {
    /// Replace all tags
    Set { tags: Vec<String> },
    Add { tag: String },
    Remove { tag: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    Show,
    Set {
        #[arg(long)]
        source_dir: Option<String>,
        #[arg(long)]
        file_pattern: Option<String>,
        #[arg(long)]
        recursive: Option<bool>,
        /// browser-cookies | cookie-file
        #[arg(long)]
        auth_mode: Option<String>,
        #[arg(long)]
        browser: Option<String>,
        #[arg(long)]
        cookie_file: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let data_dir = cli.data_dir.unwrap_or_else(StoreLayout::default_root);
    let state = AppState::open(data_dir)?;
    let json = cli.json;

    match cli.command {
        Commands::Scan { source_dir } => {
            let result = application::scan_source(&state, source_dir)?;
            if json {
                print_json(&result)?;
            } else {
                println!(
                    "Scanned {} files in {}: {} URLs, {} unique, {} new, {} existing, {} duplicates",
                    result.files_scanned,
                    result.source_dir,
                    result.total_urls,
                    result.unique_urls,
                    result.new_urls,
                    result.existing_urls,
                    result.duplicates
                );
                for (platform, count) in &result.by_platform {
                    println!("  {:<10} {}", platform, count);
                }
                for warning in &result.warnings {
                    println!("  skipped {}: {}", warning.path, warning.message);
                }
            }
        }

        Commands::Validate { ids } => {
            let accepted = application::start_validate(&state, optional(ids))?;
            follow(&state, accepted.count, &accepted.task, json).await?;
        }

        Commands::Scrape { ids } => {
            let accepted = application::start_scrape(&state, optional(ids))?;
            follow(&state, accepted.count, &accepted.task, json).await?;
        }

        Commands::Download { ids } => {
            let accepted = application::start_download(&state, optional(ids))?;
            follow(&state, accepted.count, &accepted.task, json).await?;
        }

        Commands::Run {
            source_dir,
            download,
        } => {
            let result = application::scan_source(&state, source_dir)?;
            println!(
                "Scan: {} unique URLs, {} new",
                result.unique_urls, result.new_urls
            );

            let accepted = application::start_validate(&state, None)?;
            follow(&state, accepted.count, &accepted.task, json).await?;

            let accepted = application::start_scrape(&state, None)?;
            follow(&state, accepted.count, &accepted.task, json).await?;

            if download {
                let accepted = application::start_download(&state, None)?;
                follow(&state, accepted.count, &accepted.task, json).await?;
            }
        }

        Commands::List {
            status,
            platform,
            author,
            media_type,
            tag,
            search,
            sort,
            asc,
            limit,
            offset,
            inaccessible,
        } => {
            if inaccessible {
                let posts = application::list_inaccessible(&state)?;
                if json {
                    print_json(&posts)?;
                } else {
                    posts.iter().for_each(print_row);
                }
                return Ok(());
            }

            let page = application::list_posts(
                &state,
                ListPostsDto {
                    status,
                    platform,
                    authors: author,
                    media_type,
                    tag,
                    search,
                    sort_by: sort,
                    sort_desc: Some(!asc),
                    limit,
                    offset,
                },
            )?;
            if json {
                print_json(&page)?;
            } else {
                page.posts.iter().for_each(print_row);
                println!("Showing {} of {}", page.posts.len(), page.total);
            }
        }

        Commands::Show { id } => {
            let post = application::get_post(&state, id)?;
            print_json(&post)?;
        }

        Commands::Tag { id, action } => {
            let post = match action {
                TagAction::Set { tags } => application::set_tags(&state, id, tags)?,
                TagAction::Add { tag } => application::add_tag(&state, id, tag)?,
                TagAction::Remove { tag } => application::remove_tag(&state, id, tag)?,
            };
            println!("{}: [{}]", post.id, post.tags.join(", "));
        }

        Commands::Note { id, text } => {
            let post = application::set_note(&state, id, text)?;
            println!("{}: {}", post.id, post.note.as_deref().unwrap_or("(no note)"));
        }

        Commands::Delete { ids } => {
            let report = application::delete_posts(&state, ids)?;
            if json {
                print_json(&report)?;
            } else {
                println!("Deleted {} posts", report.deleted_count);
                for error in &report.errors {
                    println!("  {}: {}", error.id, error.message);
                }
            }
            if !report.errors.is_empty() {
                bail!("{} posts could not be deleted", report.errors.len());
            }
        }

        Commands::Stats => {
            let stats = application::get_statistics(&state)?;
            print_json(&stats)?;
        }

        Commands::Reindex => {
            let count = application::reindex(&state)?;
            println!("Reindexed {} posts", count);
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => print_json(&application::get_config(&state))?,
            ConfigAction::Set {
                source_dir,
                file_pattern,
                recursive,
                auth_mode,
                browser,
                cookie_file,
            } => {
                let config = application::update_config(
                    &state,
                    UpdateConfigDto {
                        source_dir,
                        file_pattern,
                        recursive,
                        auth_mode,
                        browser,
                        cookie_file,
                    },
                )?;
                print_json(&config)?;
                if config.restart_required {
                    println!("Authentication changes apply on the next run");
                }
            }
        },

        Commands::Open { id } => application::open_post_media(&state, id)?,
    }

    Ok(())
}

fn optional(ids: Vec<String>) -> Option<Vec<String>> {
    if ids.is_empty() {
        None
    } else {
        Some(ids)
    }
}

/// Poll the task slot until it frees up, printing progress and finished records
async fn follow(state: &AppState, count: usize, task: &str, json: bool) -> Result<()> {
    println!("{}: {} posts", task, count);

    loop {
        tokio::time::sleep(POLL_INTERVAL).await;

        for record in application::take_recent(state) {
            if !json {
                println!(
                    "  {} {:<9} {}",
                    record.id,
                    record.status,
                    record.preview.as_deref().unwrap_or(&record.url)
                );
            }
        }

        let status = application::task_status(state);
        if status.is_running {
            log::debug!("{}", status.message);
            continue;
        }

        if json {
            print_json(&status)?;
        } else {
            println!("{}", status.message);
            for error in &status.errors {
                println!("  ! {}", error);
            }
        }
        if status.state == "failed" {
            bail!("{} task failed: {}", task, status.message);
        }
        return Ok(());
    }
}

fn print_row(post: &PostDto) {
    println!(
        "{} {:<9} {:<10} {:<20} {}",
        post.id,
        post.status,
        post.platform,
        post.author.as_deref().unwrap_or("-"),
        post.url
    );
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
