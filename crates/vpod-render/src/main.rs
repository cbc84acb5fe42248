//! Episode renderer binary.
//!
//! Reads the episode registry, picks an episode (by guid or the most
//! recently published), and renders it end to end.

use anyhow::{bail, Context};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vpod_models::parse_episodes;
use vpod_render::{build_episode_clip_library, render_episode, RenderContext};

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,vpod=debug"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let episodes_path = std::env::var("VP_EPISODES_PATH")
        .unwrap_or_else(|_| "data/episodes.json".to_string());

    // `vpod-render [guid]` renders; `vpod-render clips <count> [guid]`
    // only builds and publishes the clip library.
    let mut args = std::env::args().skip(1);
    let first = args.next();
    let (clips_count, wanted_guid) = match first.as_deref() {
        Some("clips") => {
            let count: usize = args
                .next()
                .context("usage: vpod-render clips <count> [guid]")?
                .parse()
                .context("clip count must be a positive integer")?;
            if count == 0 {
                bail!("clip count must be a positive integer");
            }
            (Some(count), args.next())
        }
        _ => (None, first),
    };

    let ctx = RenderContext::from_env().context("loading configuration")?;

    let registry = tokio::fs::read_to_string(&episodes_path)
        .await
        .with_context(|| format!("reading {}", episodes_path))?;
    let episodes = parse_episodes(&registry).context("parsing episode registry")?;
    if episodes.is_empty() {
        bail!("no renderable episodes in {}", episodes_path);
    }

    let episode = match wanted_guid {
        Some(guid) => episodes
            .iter()
            .find(|e| e.guid == guid)
            .with_context(|| format!("episode {} not found", guid))?,
        // Registry is sorted by publication date; render the newest.
        None => episodes
            .last()
            .context("no renderable episodes")?,
    };

    info!(guid = %episode.guid, title = %episode.title, "selected episode");
    if let Some(count) = clips_count {
        let library = build_episode_clip_library(&ctx, episode, count).await?;
        info!(
            zip = %library.zip_asset_name,
            sha256 = %library.zip_sha256,
            "done"
        );
        return Ok(());
    }

    let rendered = render_episode(&ctx, episode).await?;
    info!(
        video = %rendered.video_path.display(),
        manifest = %rendered.manifest_path.display(),
        "done"
    );
    Ok(())
}
