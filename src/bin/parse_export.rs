use anyhow::{bail, Context, Result};
use pmo_dashboard::{
    dashboard::Dashboard,
    fetch::parse_export,
    records::{CsvOptions, ProjectRecord},
};
use std::{env, fs, io, path::PathBuf, process::exit};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

struct Args {
    file: PathBuf,
    delimiter: u8,
    search: Option<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = env::args().skip(1);
    let mut file = None;
    let mut delimiter = b',';
    let mut search = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--delimiter" => {
                let v = args.next().context("--delimiter needs a value")?;
                let mut chars = v.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii() && c != '"' => delimiter = c as u8,
                    _ => bail!("--delimiter must be a single ASCII character, got `{}`", v),
                }
            }
            "--search" => search = Some(args.next().context("--search needs a value")?),
            other if file.is_none() => file = Some(PathBuf::from(other)),
            other => bail!("unexpected argument `{}`", other),
        }
    }

    Ok(Args {
        file: file.context("missing FILE")?,
        delimiter,
        search,
    })
}

fn main() {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(io::stderr)
        .init();

    let args = match parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Usage: parse_export <FILE> [--delimiter C] [--search QUERY]");
            exit(2);
        }
    };
    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let text = fs::read_to_string(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let name = args.file.file_name().and_then(|n| n.to_str());
    let opts = CsvOptions {
        delimiter: args.delimiter,
    };
    let dataset = parse_export(name, &text, &opts)
        .with_context(|| format!("parsing {}", args.file.display()))?;
    info!(records = dataset.len(), warnings = dataset.warnings.len(), "parsed");

    let typed = ProjectRecord::matches_headers(&dataset.headers);
    let mut dashboard = Dashboard::new();
    dashboard.replace(dataset);
    let hits = dashboard.search(args.search.as_deref().unwrap_or(""));

    let out = if typed {
        let projects: Vec<ProjectRecord> = hits
            .into_iter()
            .filter_map(ProjectRecord::from_record)
            .collect();
        serde_json::to_string_pretty(&projects)?
    } else {
        serde_json::to_string_pretty(&hits)?
    };
    println!("{}", out);
    Ok(())
}
