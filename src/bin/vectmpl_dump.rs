use anyhow::{Context, Result, bail, format_err};
use clap::{Arg, ArgAction, ArgMatches, Command};
use dialoguer::Confirm;
use indoc::indoc;
use log::{LevelFilter, info};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use vectmpl::{ReaderSettings, Tag, Template, TemplateReader, VectorSet};

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::exit;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VectorOutputFormat {
    Text,
    Json,
    Jsonl,
}

struct VectmplDump {
    input: PathBuf,
    output_format: VectorOutputFormat,
    output: Box<dyn Write>,
    reader_settings: ReaderSettings,
    limit: Option<u64>,
    hexdump: bool,
    verbosity_level: Option<LevelFilter>,
}

impl VectmplDump {
    pub fn from_cli_matches(matches: &ArgMatches) -> Result<Self> {
        let input = PathBuf::from(
            matches
                .get_one::<String>("INPUT")
                .ok_or_else(|| format_err!("missing INPUT"))?,
        );

        let output_format = match matches.get_one::<String>("output-format").map(String::as_str) {
            Some("json") => VectorOutputFormat::Json,
            Some("jsonl") => VectorOutputFormat::Jsonl,
            _ => VectorOutputFormat::Text,
        };

        let hexdump = matches.get_flag("hexdump");
        if hexdump && output_format != VectorOutputFormat::Text {
            eprintln!("--hexdump only affects text output, ignoring it");
        }

        let verbosity_level = match matches.get_count("verbose") {
            0 => None,
            1 => Some(LevelFilter::Info),
            2 => Some(LevelFilter::Debug),
            3 => Some(LevelFilter::Trace),
            _ => {
                eprintln!("using more than -vvv does not affect verbosity level");
                Some(LevelFilter::Trace)
            }
        };

        let output: Box<dyn Write> =
            if let Some(path) = matches.get_one::<String>("output-target") {
                let f = Self::create_output_file(path, !matches.get_flag("no-confirm-overwrite"))
                    .with_context(|| {
                        format!("An error occurred while creating output file at `{}`", path)
                    })?;
                Box::new(BufWriter::new(f))
            } else {
                Box::new(BufWriter::new(io::stdout()))
            };

        Ok(VectmplDump {
            input,
            output_format,
            output,
            reader_settings: ReaderSettings::new().strict(matches.get_flag("strict")),
            limit: matches.get_one::<u64>("limit").copied(),
            hexdump: hexdump && output_format == VectorOutputFormat::Text,
            verbosity_level,
        })
    }

    /// Main entry point for `VectmplDump`
    pub fn run(&mut self) -> Result<()> {
        self.try_to_initialize_logging();

        let reader: Box<dyn BufRead> = if self.input.as_os_str() == "-" {
            Box::new(BufReader::new(io::stdin()))
        } else {
            let f = File::open(&self.input)
                .with_context(|| format!("Failed to open file {}", self.input.display()))?;
            Box::new(BufReader::new(f))
        };

        let mut reader = TemplateReader::new(reader).with_configuration(self.reader_settings.clone());
        let mut template = Template::new();
        let mut collected = Vec::new();
        // Stands in for the output of the previous step when a field asks for a context copy.
        let mut context: Vec<u8> = Vec::new();

        while let Some(vector) = reader
            .read_block(&mut template)
            .with_context(|| format!("Failed to read {}", self.input.display()))?
        {
            let mut combination = 0;
            while self.limit.is_none_or(|limit| combination < limit) && template.next() {
                let set = VectorSet::capture(&mut template, vector, combination, &context)?;
                if let Some(ctx) = set.get(Tag::Ctx) {
                    context = ctx.to_vec();
                }

                match self.output_format {
                    VectorOutputFormat::Text if self.hexdump => set.write_hexdump(&mut self.output)?,
                    VectorOutputFormat::Text => set.write_text(&mut self.output)?,
                    VectorOutputFormat::Jsonl => {
                        serde_json::to_writer(&mut self.output, &set)?;
                        writeln!(self.output)?;
                    }
                    VectorOutputFormat::Json => collected.push(set),
                }
                combination += 1;
            }
            info!("vector {}: {} combinations", vector, combination);
        }

        if self.output_format == VectorOutputFormat::Json {
            serde_json::to_writer_pretty(&mut self.output, &collected)?;
            writeln!(self.output)?;
        }

        self.output.flush()?;
        Ok(())
    }

    /// If `prompt` is passed, will display a confirmation prompt before overwriting files.
    fn create_output_file(path: impl AsRef<Path>, prompt: bool) -> Result<File> {
        let p = path.as_ref();

        if p.is_dir() {
            bail!(
                "There is a directory at {}, refusing to overwrite",
                p.display()
            );
        }

        if p.exists() && prompt {
            let confirmed = Confirm::new()
                .with_prompt(format!(
                    "Are you sure you want to override output file at {}",
                    p.display()
                ))
                .default(false)
                .interact()
                .context("Failed to write confirmation prompt to term")?;

            if !confirmed {
                bail!("Cancelled");
            }
        }

        // Ok to assume p is not an existing directory
        if let Some(parent) = p.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        Ok(File::create(p)?)
    }

    fn try_to_initialize_logging(&self) {
        if let Some(level) = self.verbosity_level {
            if let Err(e) = TermLogger::init(
                level,
                Config::default(),
                TerminalMode::Stderr,
                ColorChoice::Auto,
            ) {
                eprintln!("Failed to initialize logging: {}", e);
            }
        }
    }
}

fn cli() -> Command {
    Command::new("vectmpl_dump")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Expands test vector templates into concrete vectors")
        .long_about(indoc!(r#"
            Expands test vector templates into concrete vectors.

            Every block of the template is enumerated as a cross product of its field
            alternatives, with the last declared field varying fastest. Fields declared
            as `@` receive the CTX bytes of the previously emitted vector.
        "#))
        .arg(
            Arg::new("INPUT")
                .required(true)
                .help("Template file to expand, or `-` to read from stdin."),
        )
        .arg(
            Arg::new("output-format")
                .short('o')
                .long("format")
                .value_parser(["text", "json", "jsonl"])
                .default_value("text")
                .help("Sets the output format")
                .long_help(indoc!(r#"
                    Sets the output format:
                        "text"  - template syntax, one VEC block per vector.
                        "json"  - a single JSON array of vectors.
                        "jsonl" - one JSON object per line.
                "#)),
        )
        .arg(
            Arg::new("output-target")
                .long("output")
                .short('f')
                .value_name("FILE")
                .help("Writes output to the file specified instead of stdout, errors will still be printed to stderr. \
                       Will ask for confirmation before overwriting files, to allow overwriting, pass `--no-confirm-overwrite`. \
                       Will create parent directories if needed."),
        )
        .arg(
            Arg::new("no-confirm-overwrite")
                .long("no-confirm-overwrite")
                .action(ArgAction::SetTrue)
                .help("When set, will not ask for confirmation before overwriting files, useful for automation"),
        )
        .arg(
            Arg::new("limit")
                .long("limit")
                .value_name("N")
                .value_parser(clap::value_parser!(u64))
                .help("Emit at most N combinations per block."),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .action(ArgAction::SetTrue)
                .help("Fail on lines that do not start with a known tag instead of skipping them."),
        )
        .arg(
            Arg::new("hexdump")
                .long("hexdump")
                .action(ArgAction::SetTrue)
                .help("With text output, print each field as a canonical hexdump."),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("-v - info, -vv - debug, -vvv - trace."),
        )
}

fn main() {
    let matches = cli().get_matches();

    let result = VectmplDump::from_cli_matches(&matches).and_then(|mut app| app.run());
    if let Err(e) = result {
        eprintln!("{:?}", e);
        exit(1);
    }
}
