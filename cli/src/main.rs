//! Command line front end for a tunemates rooms API.
//!
//! Configuration comes from the environment (`TUNEMATES_API_URL`,
//! `TUNEMATES_WITH_CREDENTIALS`), optionally loaded from a `.env` file.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use shared::playlist::ordered_playlists;
use shared::room::{JobStatus, Room};
use tokio::signal;
use tracing::info;
use tunemates::{
    ClientConfig, Grouping, JobConfirmation, PlaylistSession, RoomBackend, RoomSyncController,
    RoomSyncState, RoomsClient, SyncConfig, SyncPhase,
};

#[derive(Parser, Debug)]
#[command(name = "tunemates")]
#[command(author, version, about = "Find the music your room has in common", long_about = None)]
struct Args {
    /// Rooms API base URL (overrides TUNEMATES_API_URL).
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the logged in member.
    Whoami,

    /// List your rooms.
    Rooms,

    /// Create a room and print its id.
    Create {
        /// Room name, the backend picks one when omitted.
        name: Option<String>,
    },

    /// Join a room shared with you.
    Join { room: String },

    /// Follow a room until its common music search settles.
    Watch { room: String },

    /// Start the common music search. Locks the room to new members.
    Start {
        room: String,
        /// Confirm that the room gets locked.
        #[arg(long)]
        yes: bool,
    },

    /// List the playlists computed for a room.
    Playlists { room: String },

    /// Show a playlist grouped by how many members share each track.
    Show {
        room: String,
        playlist: String,
        /// Only keep tracks every one of these member ids holds.
        #[arg(long, value_delimiter = ',')]
        members: Vec<String>,
        /// Lowest shared count to include.
        #[arg(long)]
        min: Option<u32>,
    },

    /// Create the playlist on your streaming account.
    Add {
        room: String,
        playlist: String,
        /// Shared counts to include, defaults to the suggested threshold.
        #[arg(long, value_delimiter = ',')]
        counts: Vec<u32>,
    },

    /// Check that the rooms API is reachable.
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();

    let mut config = ClientConfig::from_env();
    if let Some(url) = args.api_url {
        config.base_url = url;
    }
    info!("Using rooms API at {}", config.base_url);

    let client = RoomsClient::from_config(&config).context("Failed to build rooms client")?;
    let backend: Arc<dyn RoomBackend> = Arc::new(client);

    match args.command {
        Command::Whoami => {
            let user = backend.current_user().await?;
            println!("{} ({})", user.name, user.id);
            Ok(())
        }
        Command::Rooms => {
            let rooms = backend.list_rooms().await?;
            if rooms.is_empty() {
                println!("No room yet, create one");
            }
            for room in &rooms {
                println!("{}", describe_room(room));
            }
            Ok(())
        }
        Command::Create { name } => {
            let room_id = backend.create_room(name.as_deref()).await?;
            println!("{room_id}");
            Ok(())
        }
        Command::Join { room } => {
            backend
                .join_room(&room)
                .await
                .with_context(|| format!("Failed to join room {room}"))?;
            let joined = backend.get_room(&room).await?;
            println!("{}", describe_room(&joined));
            Ok(())
        }
        Command::Watch { room } => {
            let sync = RoomSyncController::new(backend, SyncConfig::default());
            sync.start(&room);
            watch(&sync).await
        }
        Command::Start { room, yes } => {
            if !yes {
                bail!("Starting the search locks the room to new members, pass --yes to confirm");
            }
            let sync = RoomSyncController::new(backend, SyncConfig::default());
            sync.start(&room);
            sync.trigger_job(JobConfirmation::confirmed())
                .await
                .context("Failed to start the common music search")?;
            watch(&sync).await
        }
        Command::Playlists { room } => {
            let playlists = ordered_playlists(backend.list_playlists(&room).await?.into_values());
            if playlists.is_empty() {
                println!("No playlist yet, start the search first");
            }
            for playlist in playlists {
                println!(
                    "{:<24} {:<32} {} shared tracks",
                    playlist.id, playlist.name, playlist.shared_track_count
                );
            }
            Ok(())
        }
        Command::Show {
            room,
            playlist,
            members,
            min,
        } => {
            let mut session = PlaylistSession::load(backend, &room, &playlist).await?;
            if let (Some(min), Some(selection)) = (min, session.selection_mut()) {
                selection.set_threshold(min);
            }
            let view = session.filter_by_members(&members)?;
            print_grouping(&session.playlist().name, &view);
            Ok(())
        }
        Command::Add {
            room,
            playlist,
            counts,
        } => {
            let mut session = PlaylistSession::load(backend, &room, &playlist).await?;
            if !counts.is_empty() {
                let Some(selection) = session.selection_mut() else {
                    bail!("The playlist has no shared tracks");
                };
                for count in selection.counts_to_include() {
                    selection.exclude(count);
                }
                for &count in &counts {
                    if !selection.include(count) {
                        bail!("No track is shared by {} members", count);
                    }
                }
            }
            let created = session.create_provider_playlist().await?;
            println!("Created \"{}\": {}", created.name, created.url);
            Ok(())
        }
        Command::Health => {
            if backend.health_check().await {
                println!("ok");
                Ok(())
            } else {
                bail!("Rooms API at {} is unreachable", config.base_url)
            }
        }
    }
}

/// Prints every state change until polling stops or ctrl-c is pressed.
async fn watch(sync: &RoomSyncController) -> Result<()> {
    let mut rx = sync.subscribe();
    let mut last_line = String::new();

    loop {
        let state = rx.borrow_and_update().clone();
        let line = describe(&state);
        if line != last_line {
            println!("{line}");
            last_line = line;
        }

        match state.phase {
            SyncPhase::Settled | SyncPhase::Destroyed => break,
            SyncPhase::Unauthenticated => bail!("The rooms API rejected the session"),
            _ => {}
        }

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = signal::ctrl_c() => {
                info!("Interrupted, stopping");
                break;
            }
        }
    }

    sync.stop();
    Ok(())
}

fn describe_room(room: &Room) -> String {
    let status = match room.job_status() {
        JobStatus::NotStarted if room.locked => "locked".to_string(),
        JobStatus::NotStarted => "open".to_string(),
        JobStatus::InProgress { .. } => "searching".to_string(),
        JobStatus::Done { success: true } => "ready".to_string(),
        JobStatus::Done { success: false } => "failed".to_string(),
    };
    format!(
        "{:<24} {:<32} {} members, {}",
        room.id,
        room.name,
        room.users.len(),
        status
    )
}

fn describe(state: &RoomSyncState) -> String {
    let status = match state.job_status {
        JobStatus::NotStarted if state.locked => "locked, no search running".to_string(),
        JobStatus::NotStarted => format!("waiting for members ({} joined)", state.members.len()),
        JobStatus::InProgress { processed, total } => format!(
            "searching common music {}% ({}/{})",
            state.progress_percent, processed, total
        ),
        JobStatus::Done { success: true } => "common music ready".to_string(),
        JobStatus::Done { success: false } => "search failed".to_string(),
    };
    let name = if state.room_name.is_empty() {
        state.room_id.as_deref().unwrap_or_default()
    } else {
        state.room_name.as_str()
    };
    match &state.error {
        Some(error) => format!("[{name}] {status} ({error})"),
        None => format!("[{name}] {status}"),
    }
}

fn print_grouping(name: &str, grouping: &Grouping) {
    println!("{name}");
    if grouping.is_no_overlap() {
        println!("  No track in common yet");
        return;
    }

    for count in grouping.shared_counts() {
        let included = grouping
            .selection()
            .map_or(true, |selection| selection.includes(count));
        let marker = if included { "x" } else { " " };
        println!("[{marker}] Shared by {count} members");
        for track in grouping.group(count) {
            let holders = track
                .isrc()
                .map(|isrc| {
                    grouping
                        .members_holding(isrc)
                        .iter()
                        .map(|member| member.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            println!(
                "      {} - {} ({})  {}",
                track.artists_label(),
                track.name,
                track.formatted_duration(),
                holders
            );
        }
    }
    println!(
        "{} of {} tracks selected",
        grouping.selected_track_count(),
        grouping.total_track_count()
    );
}
