use std::path::PathBuf;

use clap::Parser;
use color_eyre::{
    Result,
    eyre::{bail, eyre},
};
use engine::{
    acquisition::CandidateFile,
    poet::{Provider, ProviderSettings},
    session::{GenerationState, Session},
};
use log::info;

/// Writes a poem about an image, without the GUI
#[derive(clap::Parser)]
struct Arg {
    image: PathBuf,

    #[arg(short, long, value_enum, default_value = "claude")]
    provider: Provider,

    #[arg(short, long)]
    key: String,

    /// Only used by the OpenAI compatible provider
    #[arg(long)]
    base_url: Option<String>,

    #[arg(long)]
    model: Option<String>,

    /// Directory the poem is exported to, defaults to the download dir
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();
    color_eyre::install()?;
    let Arg {
        image,
        provider,
        key,
        base_url,
        model,
        out,
    } = Arg::parse();

    let poet = provider.make(ProviderSettings {
        api_key: key,
        base_url,
        model,
    });
    let mut session = Session::new();

    session
        .submit_candidate_file(Some(CandidateFile::from_path(&image)))
        .await?;
    session.request_generation(poet.as_ref()).await?;
    for notice in session.take_notices() {
        info!("{}: {}", notice.title(), notice.description());
    }

    match session.generation() {
        GenerationState::Succeeded(poem) => println!("{poem}\n"),
        GenerationState::Failed(message) => bail!("Generation failed: {message}"),
        other => bail!("Unexpected generation state: {other:?}"),
    }

    let out = match out {
        Some(dir) => dir,
        None => dirs::download_dir()
            .or_else(|| std::env::current_dir().ok())
            .ok_or(eyre!("Couldn't find a directory to export to"))?,
    };
    let path = session.export_artifact(&out)?;
    for notice in session.take_notices() {
        info!("{}: {}", notice.title(), notice.description());
    }
    println!("Saved poem to {}", path.display());

    Ok(())
}
