use clap::{Parser, Subcommand};
use comfyui_image_relay::comfyui::history::{produced_images, Artifact};
use comfyui_image_relay::pipeline::ingest;
use comfyui_image_relay::{Config, ImageRelay};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "relayctl", about = "CLI for the ComfyUI image relay", version)]
struct Cli {
    /// Override COMFYUI_URL
    #[arg(global = true, long)]
    comfyui_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a local image through ComfyUI and relay the results to the backend
    Process {
        /// Image to process
        file: PathBuf,
    },
    /// Store an image in the ComfyUI input directory and queue the workflow
    Dispatch {
        /// Image to process
        file: PathBuf,
    },
    /// Show output images recorded for a prompt
    History {
        /// Prompt ID returned by dispatch
        prompt_id: String,
        /// Pretty-print the full history record instead of resolved paths
        #[arg(long)]
        pretty: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    Config::dotenv_load();
    let cli = Cli::parse();

    let mut conf = Config::new()?;
    if let Some(url) = cli.comfyui_url {
        conf.comfyui_url = url.trim_end_matches('/').to_string();
    }

    match cli.command {
        Commands::Process { file } => {
            let relay = ImageRelay::new(conf);
            let original = file_name(&file);
            let source = tokio::fs::File::open(&file).await?;
            match relay.process(&original, source).await {
                Ok(report) => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                    Ok(())
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Dispatch { file } => {
            let input_dir = conf.comfyui_input_dir.clone();
            let relay = ImageRelay::new(conf);
            let source = tokio::fs::File::open(&file).await?;
            let stored = ingest::store_upload(&input_dir, &file_name(&file), source).await?;
            let prompt_id = relay.dispatch(&stored).await?;
            println!("{}", prompt_id);
            Ok(())
        }
        Commands::History { prompt_id, pretty } => {
            let base_dir = conf.comfyui_base_dir()?;
            let relay = ImageRelay::new(conf);
            let hist = relay.comfyui().get_history(&prompt_id).await.map_err(|e| {
                eprintln!("Error: {}", e);
                e
            })?;

            if pretty {
                println!("{}", serde_json::to_string_pretty(&hist)?);
                return Ok(());
            }
            let save_node_id = &relay.config().save_image_node_id;
            match produced_images(&hist, &prompt_id, save_node_id)? {
                Some(images) => {
                    for artifact in images.iter().filter_map(Artifact::from_value) {
                        println!("{}", artifact.resolve(&base_dir).display());
                    }
                }
                None => eprintln!("No images yet for prompt_id={}", prompt_id),
            }
            Ok(())
        }
    }
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.bin")
        .to_string()
}
