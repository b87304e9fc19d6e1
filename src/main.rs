/// Main entry point for the learning tracker CLI
///
/// Each invocation is one execution context over the shared database: it
/// loads the user's state, applies one command and prints the resulting view.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::info;

use learning_tracker::storage::save;
use learning_tracker::{
    default_database_path, Category, ContentLibrary, GoalDraft, GoalId, Intent, ItemDraft,
    ItemId, ItemType, JsonFileBackup, Priority, ProgressView, RoadmapDraft, RoadmapId,
    SqliteStore, StateManager, TimerState, TrackerConfig, UserId,
};

/// Command line arguments for the learning tracker
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file
    /// If not provided, uses a default location in the user's data directory
    #[arg(long)]
    database: Option<PathBuf>,

    /// Account whose progress is read and written
    #[arg(long, default_value = "anonymous")]
    user: String,

    /// Directory receiving a JSON backup after every change
    #[arg(long)]
    backup_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable verbose output (implies debug)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show roadmaps, goals, streak and badges
    Status {
        /// Print the view as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a quantified goal
    AddGoal {
        #[arg(long)]
        name: String,
        #[arg(long, value_parser = parse_category)]
        category: Category,
        #[arg(long)]
        target: f64,
        #[arg(long, default_value = "minutes")]
        unit: String,
        /// RFC 3339 timestamp
        #[arg(long)]
        deadline: Option<DateTime<Utc>>,
    },
    DeleteGoal {
        id: String,
    },
    /// Set a goal's progress back to zero
    ResetGoal {
        id: String,
    },
    /// Create a roadmap, optionally with items given as `type:title`
    AddRoadmap {
        #[arg(long)]
        title: String,
        #[arg(long, value_parser = parse_category)]
        category: Category,
        #[arg(long, default_value = "")]
        goal: String,
        /// Planned minutes per week
        #[arg(long, default_value_t = 0)]
        weekly_time: u32,
        #[arg(long = "item", value_parser = parse_item)]
        items: Vec<ItemDraft>,
    },
    AddItem {
        roadmap: String,
        #[arg(long = "type", value_parser = parse_item_type)]
        item_type: ItemType,
        #[arg(long)]
        title: String,
        #[arg(long, value_parser = parse_priority, default_value = "medium")]
        priority: Priority,
        /// Estimated minutes
        #[arg(long)]
        estimated_time: Option<u32>,
    },
    Complete {
        roadmap: String,
        item: String,
    },
    Uncomplete {
        roadmap: String,
        item: String,
    },
    DeleteRoadmap {
        id: String,
    },
    /// Record practice without a timed session
    Activity {
        #[arg(long, value_parser = parse_category)]
        category: Category,
        #[arg(long)]
        amount: f64,
    },
    /// Run a countdown and record it as activity when it completes
    Session {
        #[arg(long, default_value_t = 25)]
        minutes: i64,
        #[arg(long, value_parser = parse_category, default_value = "general")]
        category: Category,
    },
    /// Replace the content library with a JSON document
    ImportContent {
        file: PathBuf,
    },
    /// Print the status whenever another context changes it
    Watch,
}

fn parse_category(s: &str) -> Result<Category, String> {
    Category::parse(s).ok_or_else(|| format!("unknown category '{}'", s))
}

fn parse_item_type(s: &str) -> Result<ItemType, String> {
    ItemType::parse(s).ok_or_else(|| format!("unknown item type '{}'", s))
}

fn parse_priority(s: &str) -> Result<Priority, String> {
    Priority::parse(s).ok_or_else(|| format!("unknown priority '{}'", s))
}

fn parse_item(s: &str) -> Result<ItemDraft, String> {
    let (kind, title) = s
        .split_once(':')
        .ok_or_else(|| format!("expected 'type:title', got '{}'", s))?;
    Ok(ItemDraft {
        item_type: parse_item_type(kind)?,
        title: title.to_string(),
        priority: Priority::default(),
        estimated_time: None,
    })
}

fn print_view(view: &ProgressView) {
    println!("Streak: {} day(s){}", view.streak_days, if view.streak_alive { "" } else { " (broken)" });
    if !view.badges.is_empty() {
        println!("Badges: {}", view.badges.join(", "));
    }

    println!("Roadmaps:");
    for roadmap in &view.roadmaps {
        let estimate = roadmap
            .estimated_completion_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!(
            "  {} {} [{}] {}% ({}/{}) est. {}",
            roadmap.id,
            roadmap.title,
            roadmap.category.display_name(),
            roadmap.progress,
            roadmap.completed_items,
            roadmap.total_items,
            estimate
        );
    }

    println!("Goals:");
    for goal in &view.goals {
        println!(
            "  {} {} [{}] {:.1}/{:.1} {} ({:.0}%){}",
            goal.id,
            goal.name,
            goal.category.display_name(),
            goal.progress,
            goal.target,
            goal.unit,
            goal.percent,
            if goal.completed { " done" } else { "" }
        );
    }
}

async fn run_session(
    manager: &mut StateManager<SqliteStore>,
    minutes: i64,
    category: Category,
) -> Result<(), Box<dyn std::error::Error>> {
    manager.dispatch(Intent::StartSession {
        duration_secs: minutes.saturating_mul(60),
        category,
    })?;

    let mut ticks = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                manager.dispatch(Intent::CancelSession)?;
                println!("Session cancelled");
                return Ok(());
            }
            _ = ticks.tick() => {
                let Some(snapshot) = manager.session_snapshot() else {
                    return Ok(());
                };
                eprint!("\r{:>4}:{:02} remaining", snapshot.time_remaining / 60, snapshot.time_remaining % 60);
                if snapshot.state == TimerState::Completed {
                    eprintln!();
                    manager.sync();
                    println!("Session complete");
                    print_view(&manager.view());
                    return Ok(());
                }
            }
        }
    }
}

async fn watch(manager: &mut StateManager<SqliteStore>) -> Result<(), Box<dyn std::error::Error>> {
    print_view(&manager.view());
    let mut ticks = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            _ = ticks.tick() => {
                if manager.sync() {
                    println!();
                    print_view(&manager.view());
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Set up logging based on command line flags
    let log_level = if args.verbose {
        "debug"
    } else if args.debug {
        "info"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!("learning_tracker={}", log_level))
        .with_writer(std::io::stderr) // Send logs to stderr, not stdout
        .init();

    // Determine database path
    let db_path = match args.database {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            path
        }
        None => default_database_path()?,
    };
    info!("Using database at: {}", db_path.display());

    let store = SqliteStore::open(&db_path)?;
    let config = TrackerConfig::for_user(UserId::from(args.user));
    let mut manager = StateManager::open(store, config);
    if let Some(dir) = args.backup_dir {
        manager = manager.with_backup(JsonFileBackup::new(dir));
    }

    let intent = match args.command {
        Command::Status { json } => {
            let view = manager.view();
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print_view(&view);
            }
            return Ok(());
        }
        Command::Session { minutes, category } => {
            return run_session(&mut manager, minutes, category).await;
        }
        Command::Watch => return watch(&mut manager).await,
        Command::ImportContent { file } => {
            let contents = std::fs::read_to_string(&file)?;
            let library = ContentLibrary::import_json(&contents)?;
            save(manager.store(), ContentLibrary::STORAGE_KEY, &library);
            println!(
                "Imported {} words, {} exercises, {} videos",
                library.words.len(),
                library.exercises.len(),
                library.videos.len()
            );
            return Ok(());
        }
        Command::AddGoal {
            name,
            category,
            target,
            unit,
            deadline,
        } => Intent::AddGoal(GoalDraft {
            name,
            category,
            target,
            unit,
            deadline,
        }),
        Command::DeleteGoal { id } => Intent::DeleteGoal(GoalId::from(id)),
        Command::ResetGoal { id } => Intent::ResetGoal(GoalId::from(id)),
        Command::AddRoadmap {
            title,
            category,
            goal,
            weekly_time,
            items,
        } => Intent::AddRoadmap(RoadmapDraft {
            title,
            goal,
            category,
            weekly_time,
            items,
        }),
        Command::AddItem {
            roadmap,
            item_type,
            title,
            priority,
            estimated_time,
        } => Intent::AddItem {
            roadmap_id: RoadmapId::from(roadmap),
            draft: ItemDraft {
                item_type,
                title,
                priority,
                estimated_time,
            },
        },
        Command::Complete { roadmap, item } => Intent::CompleteItem {
            roadmap_id: RoadmapId::from(roadmap),
            item_id: ItemId::from(item),
        },
        Command::Uncomplete { roadmap, item } => Intent::UncompleteItem {
            roadmap_id: RoadmapId::from(roadmap),
            item_id: ItemId::from(item),
        },
        Command::DeleteRoadmap { id } => Intent::DeleteRoadmap(RoadmapId::from(id)),
        Command::Activity { category, amount } => Intent::RecordActivity { category, amount },
    };

    let view = manager.dispatch(intent)?;
    print_view(&view);
    Ok(())
}
