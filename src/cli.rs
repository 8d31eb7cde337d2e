use std::sync::Arc;
use std::time::Duration;

use artistfeed::ClientBuilder;
use artistfeed::clients::{
    ArtistId, ArtistRecord, ErrorMode, RelatedLimit, SpotifyClient,
    errors::{ApiError, Error, Result},
};
use chrono::DateTime;
use clap::{Parser, Subcommand};
use futures::stream::{StreamExt, iter};
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "artistfeed")]
#[command(version, about = "Look up Spotify artists and their related artists", long_about = None)]
struct Cli {
    /// Fail on API errors instead of printing an empty result
    #[arg(long, global = true)]
    strict: bool,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value_t = 30)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print an artist as JSON
    Artist { id: String },
    /// Print artists related to the given one
    Related {
        id: String,
        /// Number of artists to request (1-20)
        #[arg(long, default_value_t = 10)]
        limit: i64,
        /// Print one name per line instead of JSON
        #[arg(long)]
        names: bool,
    },
    /// Fetch several artists concurrently, one line per artist
    Artists {
        #[arg(required = true)]
        ids: Vec<String>,
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
    },
    /// Make sure an access token is cached and show when it expires
    Token,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let client = build_client(&cli).await?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling ...");
            on_interrupt.cancel();
        }
    });

    match cli.command {
        Commands::Artist { id } => {
            let id = ArtistId::new(id)?;
            let record = client.get_artist(&id, &cancel).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Related { id, limit, names } => {
            let id = ArtistId::new(id)?;
            let limit = RelatedLimit::new(limit)?;
            let related = client.get_related_artists(&id, limit, &cancel).await?;
            info!("{} related artists for {id}", related.artists.len());
            if names {
                for artist in &related.artists {
                    println!("{}", artist.name().unwrap_or("<unnamed>"));
                }
            } else {
                println!("{}", serde_json::to_string_pretty(&related)?);
            }
        }
        Commands::Artists { ids, concurrency } => {
            fetch_many(&client, ids, concurrency, &cancel).await?;
        }
        Commands::Token => {
            client.credentials().get_token(&cancel).await?;
            match client.credentials().cached_credential().await? {
                Some(credential) => {
                    let expires = DateTime::from_timestamp(credential.expires_at, 0)
                        .map_or_else(|| credential.expires_at.to_string(), |t| t.to_rfc3339());
                    println!("Access token cached, expires at {expires}");
                }
                // A store that drops writes, or a token that expired immediately
                None => println!("Access token obtained but not cached"),
            }
        }
    }
    Ok(())
}

async fn build_client(cli: &Cli) -> Result<SpotifyClient> {
    let mode = if cli.strict {
        ErrorMode::Strict
    } else {
        ErrorMode::Lenient
    };
    let builder = ClientBuilder::new()
        .error_mode(mode)
        .timeout(Duration::from_secs(cli.timeout.max(1)));

    #[cfg(feature = "persistent-state")]
    let builder = {
        let storage = artistfeed::clients::LocalStorage::try_default().await?;
        builder.store(Arc::new(storage))
    };
    #[cfg(not(feature = "persistent-state"))]
    let builder = builder.store(Arc::new(artistfeed::clients::MemoryStateStore::new()));

    builder.build()
}

// Look up artists concurrently; auth failure or cancellation aborts, other failures are reported per artist
async fn fetch_many(
    client: &SpotifyClient,
    ids: Vec<String>,
    concurrency: usize,
    cancel: &CancellationToken,
) -> Result<()> {
    let ids = ids
        .into_iter()
        .map(ArtistId::new)
        .collect::<Result<Vec<_>>>()?;
    debug!("Fetching {} artists, concurrency {concurrency}", ids.len());

    let results = iter(ids)
        .map(|id| async move {
            let result = client.get_artist(&id, cancel).await;
            (id, result)
        })
        .buffer_unordered(concurrency.max(1))
        .collect::<Vec<(ArtistId, Result<ArtistRecord>)>>()
        .await;

    for (id, result) in results {
        match result {
            Ok(record) if record.is_empty() => println!("{id}\t<unavailable>"),
            Ok(record) => println!("{id}\t{}", record.name().unwrap_or("<unnamed>")),
            Err(e @ (Error::Auth(_) | Error::Api(ApiError::Cancelled))) => return Err(e),
            Err(e) => warn!("Error fetching artist {id}: {e}"),
        }
    }
    Ok(())
}
