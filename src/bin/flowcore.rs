use clap::{command, Parser, Subcommand};
use flowcore::{
    config::{self, EngineConfig},
    eval::{ContainerKind, ContainerRef, DependencyContext},
    operation::{
        memory::{BusinessDataHandler, DataHandler, InMemoryStore, PersistedWrite, TransientDataHandler},
        LeftOperandHandlerRegistry, Operation,
    },
    script::{library::ScriptLibrary, partition::PartitionKey, InMemoryPartitionLoader},
    EngineParts, Error, ExpressionEngine, InternalResult, Value,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, info};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute an operation list against in-memory stores
    Run {
        /// JSON array of operations
        #[arg(short, long)]
        operations: PathBuf,

        /// Initial context and stored values
        #[arg(short = 'x', long)]
        context: Option<PathBuf>,

        /// Engine config
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Deserialize)]
struct RunContext {
    #[serde(default = "default_container")]
    container: ContainerRef,
    #[serde(default)]
    partition: Option<PartitionKey>,
    /// `def` declarations made available to scripts of the partition.
    #[serde(default)]
    library: Option<String>,
    #[serde(default)]
    variables: HashMap<String, Value>,
    #[serde(default)]
    data: HashMap<String, Value>,
    #[serde(default)]
    transient_data: HashMap<String, Value>,
    #[serde(default)]
    business_data: HashMap<String, Value>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self {
            container: default_container(),
            partition: None,
            library: None,
            variables: HashMap::new(),
            data: HashMap::new(),
            transient_data: HashMap::new(),
            business_data: HashMap::new(),
        }
    }
}

fn default_container() -> ContainerRef {
    ContainerRef::new(1, ContainerKind::ProcessInstance)
}

#[derive(Serialize)]
struct RunReport {
    context: BTreeMap<String, Value>,
    data: BTreeMap<String, Value>,
    transient_data: BTreeMap<String, Value>,
    business_data: BTreeMap<String, Value>,
    persisted: Vec<PersistedWrite>,
}

fn seed(store: &InMemoryStore, container: &ContainerRef, values: HashMap<String, Value>) {
    for (name, value) in values {
        store.set(container, name, value);
    }
}

async fn run(
    operations: &Path,
    context: Option<&Path>,
    config_path: Option<&Path>,
) -> InternalResult<()> {
    let engine_config: EngineConfig = match config_path {
        Some(path) => config::from_file(path)?,
        None => EngineConfig::default(),
    };
    debug!("config: {:?}", engine_config);

    let operations: Vec<Operation> = config::from_file(operations)?;
    let input: RunContext = match context {
        Some(path) => config::from_file(path)?,
        None => RunContext::default(),
    };
    info!("{} operations loaded", operations.len());

    let loader = Arc::new(InMemoryPartitionLoader::new());
    if let Some(partition) = input.partition {
        let library = match &input.library {
            Some(source) => ScriptLibrary::parse(source)?,
            None => ScriptLibrary::empty(),
        };
        loader.define(partition, library);
    }

    let container = input.container.clone();
    let data = Arc::new(InMemoryStore::new());
    let transient = Arc::new(InMemoryStore::new());
    let business = Arc::new(InMemoryStore::new());
    seed(&data, &container, input.data);
    seed(&transient, &container, input.transient_data);
    seed(&business, &container, input.business_data);

    let business_handler = Arc::new(BusinessDataHandler::new(business.clone()));
    let mut handlers = LeftOperandHandlerRegistry::new();
    handlers.register(Arc::new(DataHandler::new(data.clone())))?;
    handlers.register(Arc::new(TransientDataHandler::new(transient.clone())))?;
    handlers.register(business_handler.clone())?;

    let engine = ExpressionEngine::new(engine_config, EngineParts::new(handlers, loader))?;

    let mut context = DependencyContext::from_variables(input.variables);
    if let Some(partition) = input.partition {
        context = context.with_partition(partition);
    }
    engine
        .execute_operations(&operations, &container, &mut context)
        .await?;

    let report = RunReport {
        context: context
            .variables()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect(),
        data: data.snapshot(&container),
        transient_data: transient.snapshot(&container),
        business_data: business.snapshot(&container),
        persisted: business_handler.persisted().await,
    };
    let output = serde_json::to_string_pretty(&report)
        .map_err(|e| Error::Internal(format!("Failed to serialize report: {}", e)))?;
    println!("{}", output);
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Command::Run {
            operations,
            context,
            config,
        } => run(operations, context.as_deref(), config.as_deref()).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
