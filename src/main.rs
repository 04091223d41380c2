use clap::{Parser, Subcommand};
use quillpost::{config, export, init, output, serve, site::Site};
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser)]
#[command(name = "quillpost")]
#[command(about = "Markdown blog engine: serve or export a blog from markdown posts")]
#[command(long_about = "\
Markdown blog engine: serve or export a blog from markdown posts

Project structure:

  my-blog/
  ├── quillpost.toml               # Site config (optional)
  └── assets/
      ├── posts/                   # Markdown with YAML front matter
      │   ├── hello.md             # Post: needs category + pubdate
      │   └── about.md             # Page: `page: true`
      └── media/                   # Served and exported under /media/

Front matter keys:
  Required:  title, heading, slug, description
  Posts:     category, pubdate, image_url, image_alt
  Optional:  updated, featured, page, draft, hide_image

Run 'quillpost gen-config' to print a documented quillpost.toml.")]
#[command(version)]
struct Cli {
    /// Project root containing quillpost.toml
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Log at debug level
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the site, rebuilding on changes
    Serve {
        /// Do not watch for changes
        #[arg(long)]
        no_watch: bool,
        /// Port to listen on (overrides [serve].port)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Write the static site to the export directory
    Export {
        /// Output directory (overrides [paths].export)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Validate content and list what would be built
    Check {
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Scaffold a new project in the root directory
    Init,
    /// Print a stock quillpost.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve { no_watch, port } => {
            serve::serve(&cli.root, &serve::ServeOptions { port, no_watch })?;
        }
        Command::Export { output: out } => {
            let site = Site::load(&cli.root, None)?;
            let out = out.unwrap_or_else(|| cli.root.join(&site.config.paths.export));
            println!("==> Exporting {}", out.display());
            let report = export::export(&site, &out)?;
            output::print_export_output(&report);
        }
        Command::Check { json } => {
            let site = Site::load(&cli.root, None)?;
            if json {
                let summary = output::check_summary(&site);
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("==> Checking {}", cli.root.display());
                output::print_check_output(&site);
                println!("==> Content is valid");
            }
        }
        Command::Init => {
            let report = init::init(&cli.root)?;
            for path in &report.created {
                println!("created {}", path.display());
            }
            for path in &report.skipped {
                println!("exists  {}", path.display());
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
