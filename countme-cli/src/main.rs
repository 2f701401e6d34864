use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use countme::{
    guess_reader, CountmeMatcher, Input, Item, ItemWriter, LogMatcher, Matcher, MirrorMatcher,
    Output, ReaderOptions, WriterFormat, WriterOptions,
};
use countme::{CountmeItem, LogItem, MirrorItem};
use rusqlite::Connection;
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "countme-parse")]
#[command(about = "Extract countme/mirror records from access logs and store them")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Match access log lines and write the extracted items
    Parse(ParseArgs),
    /// Read a file written by `parse` and write it in another format
    Convert(ConvertArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    /// countme requests from libdnf (CountmeItem)
    Countme,
    /// metalink/mirrorlist requests (MirrorItem)
    Mirrors,
    /// every well-formed access log line (LogItem)
    Log,
}

#[derive(Args)]
struct OutputArgs {
    /// Output format: csv, json, awk or sqlite
    #[arg(long, short, default_value = "csv")]
    format: String,

    /// Output file; stdout if omitted (required for sqlite)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// SQLite table name
    #[arg(long)]
    table: Option<String>,

    /// Field separator for awk output/input
    #[arg(long)]
    sep: Option<String>,

    /// JSON file with `writer` and `reader` option objects
    #[arg(long)]
    options: Option<PathBuf>,
}

#[derive(Args)]
struct ParseArgs {
    /// What to extract
    #[arg(long, short, value_enum, default_value = "countme")]
    matcher: Kind,

    #[command(flatten)]
    out: OutputArgs,

    /// Access logs to read; stdin if none are given
    logs: Vec<PathBuf>,
}

#[derive(Args)]
struct ConvertArgs {
    /// Item type stored in the input
    #[arg(long, short, value_enum, default_value = "countme")]
    item: Kind,

    #[command(flatten)]
    out: OutputArgs,

    /// Input file; the format is picked from its suffix (.csv, .json, .tsv, .db, ...)
    input: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OptionsFile {
    writer: WriterOptions,
    reader: ReaderOptions,
}

impl OutputArgs {
    fn load_options(&self) -> anyhow::Result<OptionsFile> {
        let mut opts = match &self.options {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("opening options file {}", path.display()))?;
                serde_json::from_reader(BufReader::new(file))
                    .with_context(|| format!("parsing options file {}", path.display()))?
            }
            None => OptionsFile::default(),
        };
        if let Some(table) = &self.table {
            opts.writer.table_name = table.clone();
            opts.reader.table_name = table.clone();
        }
        if let Some(sep) = &self.sep {
            opts.writer.field_separator = sep.clone();
            opts.reader.field_separator = sep.clone();
        }
        Ok(opts)
    }

    fn open_writer<T: Item + 'static>(
        &self,
        options: &WriterOptions,
    ) -> anyhow::Result<Box<dyn ItemWriter<T>>> {
        let format: WriterFormat = self.format.parse()?;
        let output = match (&self.output, format.needs_database()) {
            (Some(path), true) => Output::Database(
                Connection::open(path).with_context(|| format!("opening {}", path.display()))?,
            ),
            (None, true) => bail!("the {} format needs an --output file", format),
            (Some(path), false) => Output::Stream(Box::new(BufWriter::new(
                File::create(path).with_context(|| format!("creating {}", path.display()))?,
            ))),
            (None, false) => Output::Stream(Box::new(BufWriter::new(io::stdout()))),
        };
        Ok(format.open(output, options)?)
    }
}

fn open_log(path: &Path) -> anyhow::Result<Box<dyn BufRead>> {
    if path == Path::new("-") {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

fn run_parse<M>(matcher: M, args: &ParseArgs) -> anyhow::Result<()>
where
    M: Matcher,
    M::Item: 'static,
{
    let opts = args.out.load_options()?;
    let mut writer = args.out.open_writer::<M::Item>(&opts.writer)?;

    let logs = if args.logs.is_empty() {
        vec![PathBuf::from("-")]
    } else {
        args.logs.clone()
    };

    writer.write_header()?;
    let mut total = 0u64;
    for path in &logs {
        let mut items = matcher.iter_items(open_log(path)?);
        while let Some(item) = items.next() {
            let item = item.with_context(|| format!("{}: line {}", path.display(), items.lines_read()))?;
            writer.write_item(&item)?;
        }
        info!(
            "{}: {} lines read, {} {} matched",
            path.display(),
            items.lines_read(),
            items.matched(),
            matcher.name()
        );
        total += items.matched();
    }
    writer.write_footer()?;
    writer.close()?;

    info!("wrote {} {} items as {}", total, <M::Item as Item>::NAME, args.out.format);
    Ok(())
}

fn run_convert<T: Item + 'static>(args: &ConvertArgs) -> anyhow::Result<()> {
    let opts = args.out.load_options()?;
    let path = &args.input;
    let hint = path.to_string_lossy();
    let format = match guess_reader(&hint) {
        Some(format) => format,
        None => bail!("can't tell the format of {} from its name", path.display()),
    };
    let input = if format.needs_database() {
        Input::Database(Connection::open(path).with_context(|| format!("opening {}", path.display()))?)
    } else {
        Input::Stream(open_log(path)?)
    };
    let reader = format
        .open::<T>(input, &opts.reader)
        .with_context(|| format!("reading {} as {}", path.display(), T::NAME))?;

    let mut writer = args.out.open_writer::<T>(&opts.writer)?;
    let count = countme::write_items(writer.as_mut(), reader)?;
    writer.close()?;

    info!("converted {} {} items from {} to {}", count, T::NAME, format, args.out.format);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays free for data
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "countme=info,countme_parse=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Command::Parse(args) => match args.matcher {
            Kind::Countme => run_parse(CountmeMatcher::new()?, args),
            Kind::Mirrors => run_parse(MirrorMatcher::new()?, args),
            Kind::Log => run_parse(LogMatcher::new()?, args),
        },
        Command::Convert(args) => match args.item {
            Kind::Countme => run_convert::<CountmeItem>(args),
            Kind::Mirrors => run_convert::<MirrorItem>(args),
            Kind::Log => run_convert::<LogItem>(args),
        },
    }
}
