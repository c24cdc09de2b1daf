use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use setlistify_config::{load as load_config, SetlistFmConfig, SpotifyConfig};
use setlistify_setlistfm::SetlistFmClient;
use setlistify_spotify::{match_songs, SpotifyAppClient};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const USAGE: &str = "usage: setlistify [--config <file>] <command>

commands:
  search <artist name> [page]   search artists
  setlists <artist mbid> [page] list an artist's setlists
  songs <setlist id>            list the songs of a setlist
  match <setlist id>            match setlist songs against Spotify";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Search { name: String, page: u32 },
    Setlists { artist_mbid: String, page: u32 },
    Songs { setlist_id: String },
    Match { setlist_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Invocation {
    config_path: Option<PathBuf>,
    command: Command,
}

fn parse_page(arg: Option<&String>) -> Result<u32> {
    match arg {
        None => Ok(1),
        Some(raw) => {
            let page: u32 = raw.parse().with_context(|| format!("invalid page: {raw}"))?;
            if page == 0 {
                bail!("page numbers start at 1");
            }
            Ok(page)
        }
    }
}

fn parse_args(args: &[String]) -> Result<Invocation> {
    let mut config_path = None;
    let mut rest = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            let path = iter.next().ok_or_else(|| anyhow!("--config needs a file"))?;
            config_path = Some(PathBuf::from(path));
        } else {
            rest.push(arg.clone());
        }
    }

    let (name, params) = rest.split_first().ok_or_else(|| anyhow!(USAGE))?;
    let required = |what: &str| {
        params
            .first()
            .cloned()
            .ok_or_else(|| anyhow!("missing {what}\n\n{USAGE}"))
    };

    let command = match name.as_str() {
        "search" => {
            // Artist names may be passed unquoted: `search pearl jam`.
            let (page, words) = match params.split_last() {
                Some((last, words)) if !words.is_empty() && last.parse::<u32>().is_ok() => {
                    (parse_page(Some(last))?, words)
                }
                _ => (1, params),
            };
            if words.is_empty() {
                bail!("missing artist name\n\n{USAGE}");
            }
            Command::Search {
                name: words.join(" "),
                page,
            }
        }
        "setlists" => Command::Setlists {
            artist_mbid: required("artist mbid")?,
            page: parse_page(params.get(1))?,
        },
        "songs" => Command::Songs {
            setlist_id: required("setlist id")?,
        },
        "match" => Command::Match {
            setlist_id: required("setlist id")?,
        },
        other => bail!("unknown command: {other}\n\n{USAGE}"),
    };

    Ok(Invocation {
        config_path,
        command,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = parse_args(&args)?;

    let config = load_config(invocation.config_path.as_deref())?;
    init_tracing(&config.telemetry.log_level);

    let setlistfm = setlistfm_client(&config.setlistfm)?;

    match invocation.command {
        Command::Search { name, page } => {
            for artist in setlistfm.search_artist(&name, page).await? {
                if artist.disambiguation.is_empty() {
                    println!("{}  {}", artist.mbid, artist.name);
                } else {
                    println!("{}  {} ({})", artist.mbid, artist.name, artist.disambiguation);
                }
            }
        }
        Command::Setlists { artist_mbid, page } => {
            for setlist in setlistfm.get_artist_setlists(&artist_mbid, page).await? {
                println!("{}  {}", setlist.id, setlist.display_title());
            }
        }
        Command::Songs { setlist_id } => {
            for song in setlistfm.get_setlist_songs(&setlist_id).await? {
                let mut line = format!("{}.{:<3} {}", song.set_number, song.position, song.name);
                if song.is_cover() {
                    line.push_str(&format!(" ({} cover)", song.original_artist));
                }
                if song.is_encore() {
                    line.push_str(&format!(" [encore {}]", song.encore));
                }
                if song.tape {
                    line.push_str(" [tape]");
                }
                println!("{line}");
            }
        }
        Command::Match { setlist_id } => {
            let songs = setlistfm.get_setlist_songs(&setlist_id).await?;
            let spotify = spotify_client(&config.spotify).await?;
            let entries = match_songs(&spotify, &songs).await?;
            for entry in &entries {
                match &entry.track {
                    Some(track) => println!("{}  ->  {} ({})", entry.song.name, track.uri, track.album),
                    None => println!("{}  ->  no match", entry.song.name),
                }
            }
            let matched = entries.iter().filter(|e| e.is_matched()).count();
            info!(target: "cli", matched, total = entries.len(), "match finished");
        }
    }

    Ok(())
}

fn init_tracing(default_level: &str) {
    let fmt_layer = fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn setlistfm_client(config: &SetlistFmConfig) -> Result<SetlistFmClient> {
    let api_key = config
        .api_key
        .clone()
        .ok_or_else(|| anyhow!("setlistfm.api_key is not configured (SETLISTIFY_SETLISTFM__API_KEY)"))?;

    let mut builder = SetlistFmClient::builder(api_key)
        .cache_ttl(Duration::from_secs(config.cache_ttl_secs))
        .rate_limit(config.max_requests, Duration::from_millis(config.time_window_ms))
        .timeout(Duration::from_secs(config.timeout_secs))
        .max_retries(config.max_retries);
    if let Some(base_url) = &config.base_url {
        builder = builder.base_url(base_url.clone());
    }
    Ok(builder.build()?)
}

async fn spotify_client(config: &SpotifyConfig) -> Result<SpotifyAppClient> {
    let (Some(client_id), Some(client_secret)) = (&config.client_id, &config.client_secret) else {
        bail!("spotify.client_id and spotify.client_secret must be configured");
    };

    let mut builder = SpotifyAppClient::builder(client_id.clone(), client_secret.clone())
        .cache_ttl(Duration::from_secs(config.cache_ttl_secs))
        .rate_limit(config.max_requests, Duration::from_millis(config.time_window_ms))
        .timeout(Duration::from_secs(config.timeout_secs))
        .max_retries(config.max_retries);
    if let Some(base_url) = &config.base_url {
        builder = builder.base_url(base_url.clone());
    }
    if let Some(accounts_url) = &config.accounts_url {
        builder = builder.accounts_url(accounts_url.clone());
    }
    Ok(builder.connect().await?)
}
