use clap::{Args, Parser, Subcommand, ValueEnum};
use docqa_core::generator::DEFAULT_MODEL;
use docqa_core::{
    discover_documents, prepare_files, Answer, Assistant, AssistantOptions, CharacterNgramEmbedder,
    ChatCompletionsClient, ChatCompletionsConfig, ChunkingConfig, Embedder, Generator,
    GeneratorConfig, HttpEmbedder, HttpEmbedderConfig, Session, SessionError,
    DEFAULT_EMBEDDING_DIMENSIONS,
};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

type CliAssistant = Assistant<Box<dyn Embedder>, ChatCompletionsClient>;

#[derive(Parser)]
#[command(name = "docqa", version, about = "Ask grounded questions about PDF and TXT documents")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// OpenAI-compatible chat-completions base URL. The key is read from GROQ_API_KEY.
    #[arg(long, env = "DOCQA_LLM_ENDPOINT", default_value = docqa_core::generator::DEFAULT_LLM_ENDPOINT, global = true)]
    llm_endpoint: String,

    /// Model used for query rewriting, answers and suggested questions.
    #[arg(long, env = "DOCQA_QA_MODEL", default_value = DEFAULT_MODEL, global = true)]
    qa_model: String,

    /// Model used for summaries.
    #[arg(long, env = "DOCQA_SUMMARY_MODEL", default_value = DEFAULT_MODEL, global = true)]
    summary_model: String,

    /// Embedding backend.
    #[arg(long, env = "DOCQA_EMBEDDING", value_enum, default_value_t = EmbeddingBackend::Ngram, global = true)]
    embedding: EmbeddingBackend,

    /// OpenAI-compatible embeddings base URL (http backend).
    #[arg(long, env = "DOCQA_EMBEDDING_ENDPOINT", default_value = "http://localhost:11434/v1", global = true)]
    embedding_endpoint: String,

    /// Embedding model name (http backend).
    #[arg(long, env = "DOCQA_EMBEDDING_MODEL", default_value = "all-minilm", global = true)]
    embedding_model: String,

    /// Vector width produced by the embedding backend.
    #[arg(long, env = "DOCQA_EMBEDDING_DIMENSIONS", default_value_t = DEFAULT_EMBEDDING_DIMENSIONS, global = true)]
    embedding_dimensions: usize,

    /// Environment variable holding the embeddings API key, if the endpoint needs one.
    #[arg(long, env = "DOCQA_EMBEDDING_KEY_ENV", global = true)]
    embedding_key_env: Option<String>,

    /// Words per chunk.
    #[arg(long, default_value_t = 500, global = true)]
    chunk_size: usize,

    /// Words shared by neighboring chunks.
    #[arg(long, default_value_t = 100, global = true)]
    overlap: usize,

    /// Chunks retrieved per question.
    #[arg(long, default_value_t = 5, global = true)]
    top_k: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum EmbeddingBackend {
    /// Offline hashed character trigrams.
    Ngram,
    /// Remote OpenAI-compatible embeddings endpoint.
    Http,
}

#[derive(Args)]
struct Inputs {
    /// PDF or TXT file to upload. Repeatable.
    #[arg(long = "file")]
    files: Vec<PathBuf>,

    /// Folder searched recursively for PDF and TXT files.
    #[arg(long)]
    dir: Option<PathBuf>,
}

impl Inputs {
    fn paths(&self) -> Vec<PathBuf> {
        let mut paths = self.files.clone();
        if let Some(dir) = &self.dir {
            paths.extend(discover_documents(dir));
        }
        paths
    }
}

#[derive(Subcommand)]
enum Command {
    /// Print the labeled chunks without embedding or calling the LLM.
    Chunks {
        #[command(flatten)]
        inputs: Inputs,
    },
    /// Upload documents and answer one question.
    Ask {
        #[command(flatten)]
        inputs: Inputs,
        /// Question to answer.
        #[arg(long)]
        question: String,
    },
    /// Upload documents and summarize them.
    Summarize {
        #[command(flatten)]
        inputs: Inputs,
    },
    /// Upload documents and print suggested questions.
    Questions {
        #[command(flatten)]
        inputs: Inputs,
    },
    /// Interactive session over stdin.
    Chat {
        #[command(flatten)]
        inputs: Inputs,
    },
}

impl Cli {
    fn chunking(&self) -> anyhow::Result<ChunkingConfig> {
        let config = ChunkingConfig::new(self.chunk_size, self.overlap);
        config.validate()?;
        Ok(config)
    }

    fn embedder(&self) -> anyhow::Result<Box<dyn Embedder>> {
        let embedder: Box<dyn Embedder> = match self.embedding {
            EmbeddingBackend::Ngram => Box::new(CharacterNgramEmbedder {
                dimensions: self.embedding_dimensions,
            }),
            EmbeddingBackend::Http => Box::new(HttpEmbedder::new(HttpEmbedderConfig {
                endpoint: self.embedding_endpoint.clone(),
                model: self.embedding_model.clone(),
                dimensions: self.embedding_dimensions,
                api_key_env: self.embedding_key_env.clone(),
                ..HttpEmbedderConfig::default()
            })?),
        };
        Ok(embedder)
    }

    fn assistant(&self) -> anyhow::Result<CliAssistant> {
        let generator = Generator::from_env(
            ChatCompletionsConfig {
                endpoint: self.llm_endpoint.clone(),
                ..ChatCompletionsConfig::default()
            },
            GeneratorConfig {
                qa_model: self.qa_model.clone(),
                summary_model: self.summary_model.clone(),
                ..GeneratorConfig::default()
            },
        )?;

        Ok(Assistant::new(
            self.embedder()?,
            generator,
            AssistantOptions {
                chunking: self.chunking()?,
                top_k: self.top_k,
            },
        ))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    info!(version = env!("CARGO_PKG_VERSION"), "docqa boot");

    match &cli.command {
        Command::Chunks { inputs } => {
            let documents = prepare_files(&inputs.paths(), cli.chunking()?)?;
            for document in documents {
                println!("# {} ({} chunks)", document.name, document.chunks.len());
                for chunk in document.chunks {
                    println!("{chunk}");
                }
            }
        }
        Command::Ask { inputs, question } => {
            let assistant = cli.assistant()?;
            let mut session = upload(&assistant, inputs).await?;
            match assistant.ask(&mut session, question).await {
                Ok(answer) => print_answer(&answer),
                Err(error) => report(error)?,
            }
        }
        Command::Summarize { inputs } => {
            let assistant = cli.assistant()?;
            let session = upload(&assistant, inputs).await?;
            match assistant.summarize(&session).await {
                Ok(summary) => println!("{summary}"),
                Err(error) => report(error)?,
            }
        }
        Command::Questions { inputs } => {
            let assistant = cli.assistant()?;
            let session = upload(&assistant, inputs).await?;
            print_questions(session.suggested_questions());
        }
        Command::Chat { inputs } => {
            let assistant = cli.assistant()?;
            let session = upload(&assistant, inputs).await?;
            chat(&assistant, session).await?;
        }
    }

    Ok(())
}

async fn upload(assistant: &CliAssistant, inputs: &Inputs) -> anyhow::Result<Session> {
    let mut session = assistant.new_session();
    let paths = inputs.paths();
    if paths.is_empty() {
        return Ok(session);
    }

    let report = assistant.upload(&mut session, &paths).await?;
    for document in &report.documents {
        info!(document = %document.name, chunks = document.chunk_count, "uploaded");
    }
    eprintln!("Processed {} chunks", report.chunks_added);
    Ok(session)
}

/// Prints warnings and keeps going; anything else is fatal.
fn report(error: SessionError) -> anyhow::Result<()> {
    if error.is_warning() {
        eprintln!("warning: {error}");
        Ok(())
    } else {
        Err(error.into())
    }
}

fn print_answer(answer: &Answer) {
    println!("{}", answer.answer);
    println!();
    println!("Retrieved context:");
    for (index, chunk) in answer.chunks.iter().enumerate() {
        println!("  Chunk {}: {chunk}", index + 1);
    }
}

fn print_questions(questions: &[String]) {
    for (index, question) in questions.iter().enumerate() {
        println!("{}. {question}", index + 1);
    }
}

const CHAT_HELP: &str = "commands: :summary  :history  :suggest  :pick N  :upload PATH  :reset  :quit";

async fn chat(assistant: &CliAssistant, mut session: Session) -> anyhow::Result<()> {
    eprintln!("{CHAT_HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, argument) = match line.split_once(' ') {
            Some((command, argument)) => (command, argument.trim()),
            None => (line, ""),
        };

        let outcome = match command {
            ":quit" | ":q" => break,
            ":help" => {
                eprintln!("{CHAT_HELP}");
                Ok(())
            }
            ":summary" => assistant
                .summarize(&session)
                .await
                .map(|summary| println!("{summary}")),
            ":history" => {
                for (index, turn) in session.history().iter().enumerate() {
                    println!("Q{}: {}", index + 1, turn.question);
                    println!("A{}: {}", index + 1, turn.answer);
                }
                Ok(())
            }
            ":suggest" => {
                print_questions(session.suggested_questions());
                Ok(())
            }
            ":pick" => {
                let picked = argument
                    .parse::<usize>()
                    .ok()
                    .and_then(|number| number.checked_sub(1))
                    .and_then(|index| session.suggested_questions().get(index).cloned());
                match picked {
                    Some(question) => {
                        println!("> {question}");
                        assistant
                            .ask(&mut session, &question)
                            .await
                            .map(|answer| print_answer(&answer))
                    }
                    None => {
                        eprintln!("warning: no suggested question {argument}");
                        Ok(())
                    }
                }
            }
            ":upload" => assistant
                .upload(&mut session, &[PathBuf::from(argument)])
                .await
                .map(|report| eprintln!("Processed {} chunks", report.chunks_added)),
            ":reset" => {
                session.reset();
                Ok(())
            }
            _ => assistant
                .ask(&mut session, line)
                .await
                .map(|answer| print_answer(&answer)),
        };

        if let Err(error) = outcome {
            if error.is_warning() {
                eprintln!("warning: {error}");
            } else {
                warn!(%error, "request failed");
                eprintln!("error: {error}");
            }
        }
    }

    Ok(())
}
