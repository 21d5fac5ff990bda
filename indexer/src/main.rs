use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use quarry_core::builder::build_and_save;
use quarry_core::completion::{QueryCompletion, DEFAULT_THRESHOLD};
use quarry_core::persist::{save_completion, save_meta, CorpusEntry, IndexPaths, MetaFile, SCHEMA_VERSION};
use quarry_core::{
    BuildOptions, Corpus, IdfWeighting, IndexConfiguration, RetrievalModel, RetrievalSettings, SearchEngine,
    SearchResult, TermCounting, TextNormalizer,
};
use tracing_subscriber::{fmt, EnvFilter};

use std::io::{self, BufRead, Write};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query Boolean / vector-space indexes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum IdfArg {
    /// log10(N/df + 1)
    Smoothed,
    /// log10(N/(df + 1))
    Shifted,
}

#[derive(clap::Args)]
struct EngineArgs {
    /// Index directory written by `build`
    #[arg(long)]
    index: String,
    /// Corpus files or directories, in the order they were built
    #[arg(long)]
    corpus: Vec<String>,
    #[arg(long, default_value_t = 0)]
    corpus_id: u16,
    /// Normalization bits: stop words, stemming, normalization
    #[arg(long, default_value = "111")]
    config: String,
    #[arg(long, default_value = "vsm")]
    model: String,
    #[arg(long, default_value_t = 10)]
    limit: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Build all eight configurations for each input corpus
    Build {
        /// Corpus path (JSON/JSONL file or directory); repeat for several corpora
        #[arg(long, required = true)]
        input: Vec<String>,
        /// Output index directory
        #[arg(long)]
        output: String,
        #[arg(long, default_value_t = 8)]
        workers: usize,
        #[arg(long, value_enum, default_value_t = IdfArg::Smoothed)]
        idf: IdfArg,
        /// Count whole tokens instead of substring occurrences
        #[arg(long, default_value_t = false)]
        token_counting: bool,
    },
    /// Run one query and print the results
    Query {
        #[command(flatten)]
        engine: EngineArgs,
        /// Print the result as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
        query: String,
    },
    /// Interactive session reading queries from stdin
    Shell {
        #[command(flatten)]
        engine: EngineArgs,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, workers, idf, token_counting } => {
            let options = BuildOptions {
                idf: match idf {
                    IdfArg::Smoothed => IdfWeighting::Smoothed,
                    IdfArg::Shifted => IdfWeighting::ShiftedDenominator,
                },
                term_counting: if token_counting { TermCounting::Token } else { TermCounting::Substring },
            };
            build_indexes(&input, &output, workers, options)
        }
        Commands::Query { engine, json, query } => {
            let engine = open_engine(&engine)?;
            let result = engine.query(&query)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_result(&engine, &result);
            }
            Ok(())
        }
        Commands::Shell { engine } => shell(open_engine(&engine)?),
    }
}

fn build_indexes(inputs: &[String], output: &str, workers: usize, options: BuildOptions) -> Result<()> {
    let paths = IndexPaths::new(output);
    let corpora = inputs
        .iter()
        .map(|p| Corpus::from_path(p).with_context(|| format!("reading corpus {p}")))
        .collect::<Result<Vec<_>>>()?;
    for (id, corpus) in corpora.iter().enumerate() {
        tracing::info!(corpus_id = id, num_docs = corpus.len(), "ingested documents");
    }

    let statuses = build_and_save(&paths, &corpora, &TextNormalizer::new(), options, workers)?;
    let failed: Vec<String> = statuses.iter().filter(|s| !s.is_ok()).map(|s| s.key.to_string()).collect();

    for (id, corpus) in corpora.iter().enumerate() {
        let qc = QueryCompletion::build(corpus, DEFAULT_THRESHOLD);
        save_completion(&paths, id as u16, &qc)?;
    }

    let meta = MetaFile {
        num_indexes: (statuses.len() - failed.len()) as u32,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "".into()),
        version: SCHEMA_VERSION,
        corpora: inputs
            .iter()
            .zip(&corpora)
            .enumerate()
            .map(|(id, (source, corpus))| CorpusEntry {
                corpus_id: id as u16,
                source: source.clone(),
                num_docs: corpus.len() as u32,
            })
            .collect(),
    };
    save_meta(&paths, &meta)?;

    if !failed.is_empty() {
        bail!("{} of {} indexes failed: {}", failed.len(), statuses.len(), failed.join(", "));
    }
    tracing::info!(output, num_indexes = statuses.len(), "index build complete");
    Ok(())
}

fn open_engine(args: &EngineArgs) -> Result<SearchEngine> {
    let settings = RetrievalSettings { result_limit: args.limit, ..RetrievalSettings::default() };
    let mut engine = SearchEngine::load(&IndexPaths::new(&args.index), settings)?;
    for (id, path) in args.corpus.iter().enumerate() {
        let corpus = Corpus::from_path(path).with_context(|| format!("reading corpus {path}"))?;
        engine.add_corpus(id as u16, corpus);
    }
    if !engine.check_integrity() {
        tracing::warn!("some configurations are missing from the index directory");
    }
    engine.select_corpus(args.corpus_id);
    engine.set_configuration(args.config.parse::<IndexConfiguration>()?);
    engine.switch_model(Some(args.model.parse::<RetrievalModel>()?));
    Ok(engine)
}

fn print_result(engine: &SearchEngine, result: &SearchResult) {
    if !result.correction.no_correction() {
        println!("corrected: {}", result.correction);
    }
    if result.is_empty() {
        println!("no documents found");
        return;
    }
    for (rank, doc_id) in result.doc_ids.iter().enumerate() {
        let title = engine.get_doc_title(doc_id).unwrap_or("");
        match result.scores.get(rank) {
            Some(score) => println!("{:>3}. {doc_id} ({score:.4}) {title}", rank + 1),
            None => println!("{:>3}. {doc_id} {title}", rank + 1),
        }
    }
}

const SHELL_HELP: &str = "\
:model [boolean|vsm]   switch retrieval model
:stop :stem :norm      toggle a normalization step
:corpus <id>           select corpus
:feedback +id -id ...  judge results of the last query
:next <query>          suggest next words
:complete <query>      complete the last word
:quit";

fn shell(mut engine: SearchEngine) -> Result<()> {
    println!("{engine}");
    let stdin = io::stdin();
    let mut last_query: Option<String> = None;
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }
        let line = line.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() {
            continue;
        }

        let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
        match cmd {
            ":quit" | ":q" => return Ok(()),
            ":help" => println!("{SHELL_HELP}"),
            ":model" => match rest.trim() {
                "" => engine.switch_model(None),
                m => match m.parse() {
                    Ok(model) => engine.switch_model(Some(model)),
                    Err(e) => println!("{e}"),
                },
            },
            ":stop" => engine.switch_stop_words_removal(),
            ":stem" => engine.switch_stemming(),
            ":norm" => engine.switch_normalization(),
            ":corpus" => match rest.trim().parse() {
                Ok(id) => engine.select_corpus(id),
                Err(e) => println!("invalid corpus id: {e}"),
            },
            ":feedback" => {
                let Some(q) = &last_query else {
                    println!("run a query first");
                    continue;
                };
                let relevant: Vec<&str> = rest.split_whitespace().filter_map(|t| t.strip_prefix('+')).collect();
                let irrelevant: Vec<&str> = rest.split_whitespace().filter_map(|t| t.strip_prefix('-')).collect();
                if let Err(e) = engine.add_feedback(q, &relevant, &irrelevant) {
                    println!("{e}");
                }
            }
            ":next" | ":complete" => match engine.completion() {
                Some(qc) => {
                    let suggestions =
                        if cmd == ":next" { qc.following_terms(rest) } else { qc.complete_term(rest) };
                    for s in suggestions.iter().take(10) {
                        println!("  {s}");
                    }
                }
                None => println!("no completion model for this corpus"),
            },
            _ => {
                match engine.query(line) {
                    Ok(result) => print_result(&engine, &result),
                    Err(e) => println!("{e}"),
                }
                last_query = Some(line.to_string());
                continue;
            }
        }
        println!("{engine}");
    }
}
