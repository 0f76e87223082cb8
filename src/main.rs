use clap::{Parser, Subcommand};
use siidec::pipeline;
use siidec::signature::Signature;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "siidec", about = "Game save unit file decoder and editor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a save file (plaintext, encrypted or binary) to unit text
    Decode {
        input: PathBuf,
        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Re-encode a save file into the encrypted container
    Encode {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Emit plaintext instead of the encrypted container
        #[arg(long)]
        plain: bool,
    },
    /// Show container format and document statistics
    Info {
        input: PathBuf,
    },
    /// Set one property in a unit block and write the file back
    Set {
        input: PathBuf,
        /// Unit id or class name of the target block
        block: String,
        key: String,
        value: String,
        /// Write the encrypted container instead of plaintext
        #[arg(short, long)]
        encrypt: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    match Cli::parse().command {

        // ── Decode ───────────────────────────────────────────────────────────
        Commands::Decode { input, output } => {
            let data = std::fs::read(&input)?;
            let text = pipeline::decode_to_text(&data)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, text)?;
                    println!("Decoded: {}", path.display());
                }
                None => print!("{text}"),
            }
        }

        // ── Encode ───────────────────────────────────────────────────────────
        Commands::Encode { input, output, plain } => {
            let doc = pipeline::load_file(&input)?;
            let bytes = pipeline::write_document(&doc, !plain)?;
            std::fs::write(&output, bytes)?;
            println!("Encoded: {}", output.display());
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input } => {
            let data = std::fs::read(&input)?;
            let sig = pipeline::detect(&data)?;
            println!("── {} ───────────────────────────────────────────", input.display());
            println!("  Container   {}", describe(sig));
            println!("  Size        {} B", data.len());
            let doc = pipeline::read_document(&data)?;
            println!("  Blocks      {}", doc.blocks.len());
            for block in &doc.blocks {
                println!("    {:<24} {:<32} {} properties", block.kind, block.name, block.keys().count());
            }
        }

        // ── Set ──────────────────────────────────────────────────────────────
        Commands::Set { input, block, key, value, encrypt } => {
            let mut doc = pipeline::load_file(&input)?;
            let target = if doc.block_named(&block).is_some() {
                doc.block_named_mut(&block)
            } else {
                doc.block_of_kind_mut(&block)
            }
            .ok_or_else(|| format!("no block named or of kind '{block}'"))?;
            target.set(&key, value.as_str());
            pipeline::save_file(&input, &doc, encrypt)?;
            println!("Set {key} = {value} in {block} ({})", input.display());
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn describe(sig: Signature) -> &'static str {
    match sig {
        Signature::Plain => "plaintext (SiiN)",
        Signature::Encrypted => "encrypted (ScsC)",
        Signature::Binary => "binary (BSII)",
        Signature::ThreeNk => "3nK packed",
    }
}
