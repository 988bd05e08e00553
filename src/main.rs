use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;

use papernet::config::Config;
use papernet::paper::{self, UnfoldOptions};
use papernet::util_3d::Vector2;
use papernet::waveobj;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
/// Unfolds a 3D model into printable paper nets
struct Cli {
    #[arg(value_name = "OBJ_FILE")]
    input: PathBuf,

    /// Where to write the net, as JSON. The standard output by default
    #[arg(short, long, value_name = "OUT_FILE")]
    output: Option<PathBuf>,

    /// Options file to use instead of the saved defaults
    #[arg(long, value_name = "FILE")]
    options: Option<PathBuf>,

    /// Page size, in the output units, such as "0.210x0.297"
    #[arg(long, value_name = "WxH", value_parser = parse_page_size)]
    page: Option<(f32, f32)>,

    /// Scale from model units to output units
    #[arg(long)]
    scale: Option<f32>,

    /// Do not limit the size of the islands to the page
    #[arg(long)]
    no_limit: bool,

    /// Do not create stickers
    #[arg(long)]
    no_stickers: bool,

    /// Edges that must be cut, by index
    #[arg(long, value_delimiter = ',')]
    seams: Vec<u32>,

    /// Store the resulting options as the new defaults
    #[arg(long)]
    save_defaults: bool,
}

fn parse_page_size(text: &str) -> Result<(f32, f32)> {
    let (w, h) = text.split_once(['x', 'X']).ok_or_else(|| anyhow!("expected WxH"))?;
    let w: f32 = w.trim().parse()?;
    let h: f32 = h.trim().parse()?;
    if w <= 0.0 || h <= 0.0 {
        return Err(anyhow!("the page size must be positive"));
    }
    Ok((w, h))
}

impl Cli {
    fn unfold_options(&self) -> Result<UnfoldOptions> {
        let mut options = match &self.options {
            Some(file) => Config::load_from(file).with_context(|| format!("cannot load options from {}", file.display()))?.options,
            None => Config::load_or_default().options,
        };
        if let Some(page) = self.page {
            options.page_size = page;
        }
        if let Some(scale) = self.scale {
            options.scale = scale;
        }
        if self.no_limit {
            options.limit_by_page = false;
        }
        if self.no_stickers {
            options.create_stickers = false;
        }
        options.seams.extend(&self.seams);
        Ok(options)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let options = cli.unfold_options()?;
    if cli.save_defaults {
        Config { options: options.clone() }.save()?;
    }

    let obj = waveobj::Model::from_path(&cli.input)?;
    let model = obj.to_paper().with_context(|| format!("invalid model {}", cli.input.display()))?;
    log::info!("loaded {} faces and {} vertices", model.num_faces(), model.num_vertices());

    let papercraft = match paper::unfold(model, &options) {
        Ok(p) => p,
        Err(e) if e.is_internal() => return Err(e).context("unfolding failed"),
        Err(e) => return Err(anyhow!("{e}")),
    };
    let (w, h) = options.printable_size();
    log::info!(
        "the biggest island fills {:.0}% of the page",
        100.0 * papercraft.largest_island_ratio(Vector2::new(w, h))
    );
    let document = papercraft.to_document();

    match &cli.output {
        Some(path) => {
            let f = std::fs::File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
            serde_json::to_writer_pretty(std::io::BufWriter::new(f), &document)?;
            log::info!("net written to {}", path.display());
        }
        None => {
            serde_json::to_writer_pretty(std::io::stdout().lock(), &document)?;
            println!();
        }
    }
    Ok(())
}
