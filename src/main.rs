use anyhow::Result;
use clap::{Parser, Subcommand};
use image::GenericImageView;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use snapqr::{
    DirectorySaver, ImageFile, MemoryStore, Page, PayloadMode, Settings, DEFAULT_MAX_FILE_SIZE,
};

#[derive(Parser)]
#[command(name = "snapqr")]
#[command(author, version, about = "Turn an image into a downloadable QR code", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload an image and save the QR code that points at it
    Generate {
        /// Image to upload (JPG, PNG or GIF)
        input: PathBuf,

        /// Directory the QR code is downloaded into
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Simulated processing time in milliseconds
        #[arg(long, default_value = "800")]
        delay_ms: u64,

        /// Largest accepted upload in bytes
        #[arg(long, default_value_t = DEFAULT_MAX_FILE_SIZE)]
        max_size: u64,

        /// Side length of the QR image in pixels
        #[arg(long, default_value = "200")]
        size: u32,

        /// Embed the image bytes as a data URL instead of the session reference
        #[arg(long)]
        inline: bool,

        /// Also print the QR code to the terminal
        #[arg(short, long)]
        terminal: bool,
    },

    /// Print the payload of a QR code image
    #[cfg(feature = "decode")]
    Decode {
        /// PNG produced by `generate`
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            input,
            output,
            delay_ms,
            max_size,
            size,
            inline,
            terminal,
        } => {
            let settings = Settings {
                processing_delay: Duration::from_millis(delay_ms),
                max_file_size: max_size,
                qr_size: size,
                payload_mode: if inline {
                    PayloadMode::Inline
                } else {
                    PayloadMode::Reference
                },
                ..Settings::default()
            };
            let mut page = Page::new(settings, MemoryStore::new());

            println!("Uploading image: {}", input.display());
            let file = ImageFile::from_path(&input)?;

            let Some(ticket) = page.accept_file(Some(file))? else {
                return Ok(());
            };

            println!("Generating your QR code...");
            std::thread::sleep(ticket.delay);
            page.complete(ticket.generation)?;

            let (Some(image), Some(surface)) = (page.image(), page.surface()) else {
                anyhow::bail!("QR code was not generated");
            };

            if let Some(uploaded) = page.references().resolve(image) {
                let preview = image::load_from_memory(&uploaded.bytes)?;
                let (width, height) = preview.dimensions();
                println!();
                println!("Uploaded image: {} ({}x{})", uploaded.name, width, height);
            }
            println!("Reference: {}", image);
            if inline {
                println!("Payload: data URL ({} chars)", surface.payload().len());
            } else {
                println!("Payload: {}", surface.payload());
            }

            if terminal {
                println!();
                println!("{}", surface.to_terminal());
            }

            let mut saver = DirectorySaver::new(&output);
            page.download_qr(&mut saver)?;

            println!();
            for path in saver.saved() {
                println!("Saved QR code: {}", path.display());
            }
        }

        #[cfg(feature = "decode")]
        Commands::Decode { input } => {
            if !input.exists() {
                anyhow::bail!("Input path does not exist: {}", input.display());
            }

            let payload = snapqr::decode_qr_image(&input)?;
            println!("{}", payload);
        }
    }

    Ok(())
}
