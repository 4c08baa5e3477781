use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn, Instrument};

use tenantload_config::{BackendConfig, ConfigLoader, LoadConfig, LogLevel};
use tenantload_interfaces::DocumentStore;
use tenantload_logging::{init_logging_from_config, init_simple_tracing, relay_span};
use tenantload_relay::{BatchRelay, EventProducer, MemoryBroker, RelayReport, RelaySettings};
use tenantload_resilience::{wait_for_termination_signal, CancellationToken};
use tenantload_runtime::{LoadOrchestrator, RunSummary, WorkloadMode};
use tenantload_storage::{check_seed_data, connect_database, seed_tenant, SeedPlan};

mod cli;
use cli::{Cli, Commands, ConfigCommands};

/// Load configuration from file or environment, applying the --log-level override
fn load_config(config_path: Option<&PathBuf>, log_level: Option<&String>) -> Result<LoadConfig> {
    let loader = ConfigLoader::new();

    let mut config = match config_path {
        Some(path) => loader
            .from_file(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?,
        None => loader
            .from_env()
            .context("Failed to load configuration from environment")?,
    };

    if let Some(level) = log_level {
        config.logging.level = level
            .parse::<LogLevel>()
            .map_err(|e| anyhow!("Invalid --log-level: {}", e))?;
    }

    Ok(config)
}

/// Connect to `database` on the configured backend within the connect deadline
async fn connect_store(backend: &BackendConfig, database: &str) -> Result<Arc<dyn DocumentStore>> {
    let store = tokio::time::timeout(backend.connect_timeout, connect_database(backend, database))
        .await
        .map_err(|_| {
            anyhow!(
                "No connection to {} within {:?}",
                backend.uri,
                backend.connect_timeout
            )
        })?
        .with_context(|| format!("Failed to connect to {}", backend.uri))?;
    info!(backend = store.backend_name(), database, "Connected to document store");
    Ok(store)
}

/// Wait for SIGINT/SIGTERM, then fire `cancel`
async fn wait_for_shutdown(cancel: &CancellationToken) {
    match wait_for_termination_signal().await {
        Ok(signal) => info!(%signal, "Termination signal received"),
        Err(e) => error!(error = %e, "Signal handler failed, shutting down"),
    }
    cancel.cancel();
}

/// Seed every tenant that is missing customers or inventory
async fn seed_missing(orchestrator: &LoadOrchestrator) -> Result<()> {
    let config = orchestrator.config();
    let store = orchestrator.store();

    for tenant in config.tenants.tenant_ids()? {
        let status = check_seed_data(store.as_ref(), &tenant, config.workload.seed_check_timeout)
            .await
            .with_context(|| format!("Seed check for tenant {} failed", tenant))?;
        if status.is_ready() {
            info!(tenant = %tenant, "Seed data present");
            continue;
        }

        let report = seed_tenant(
            store.as_ref(),
            &tenant,
            &SeedPlan::default(),
            config.workload.write_timeout,
        )
        .await
        .with_context(|| format!("Seeding tenant {} failed", tenant))?;
        info!(
            tenant = %tenant,
            customers = report.customers,
            inventory = report.inventory,
            "Seeded tenant"
        );
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) -> Result<()> {
    let outcome = if summary.is_clean() { "clean" } else { "forced" };
    println!(
        "Run finished after {:.1}s ({} shutdown)",
        summary.elapsed.as_secs_f64(),
        outcome
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&summary.tenants).context("Failed to format run summary")?
    );
    Ok(())
}

/// Handle `load` and `read`
async fn handle_workload(config: LoadConfig, mode: WorkloadMode, seed: bool) -> Result<()> {
    let orchestrator = LoadOrchestrator::connect(config)
        .await
        .context("Failed to connect to the document backend")?
        .with_mode(mode);

    if seed {
        seed_missing(&orchestrator).await?;
    }

    let summary = orchestrator.run().await.context("Load run aborted")?;
    print_summary(&summary)
}

/// Handle `seed`
async fn handle_seed(config: LoadConfig, customers: usize, inventory: usize) -> Result<()> {
    let tenants = config.tenants.tenant_ids()?;
    if config.backend.uri.starts_with("memory://") {
        warn!("Seeding an in-memory backend; the data is gone when this process exits");
    }

    let store = connect_store(&config.backend, &config.backend.database).await?;
    let plan = SeedPlan {
        customers,
        inventory,
    };

    for tenant in tenants {
        let report = seed_tenant(store.as_ref(), &tenant, &plan, config.workload.write_timeout)
            .await
            .with_context(|| format!("Seeding tenant {} failed", tenant))?;
        println!(
            "Seeded {}: {} customers, {} inventory items",
            report.tenant, report.customers, report.inventory
        );
    }
    Ok(())
}

#[cfg(feature = "kafka")]
async fn relay_from_kafka(
    config: &LoadConfig,
    store: Arc<dyn DocumentStore>,
    settings: RelaySettings,
    cancel: CancellationToken,
) -> Result<RelayReport> {
    let consumer = tenantload_relay::KafkaConsumer::new(&config.relay)
        .context("Failed to create Kafka consumer")?;
    let relay = tokio::spawn(
        BatchRelay::new(consumer, store, settings)
            .run(cancel.clone())
            .instrument(relay_span(&config.relay.topic)),
    );
    wait_for_shutdown(&cancel).await;
    Ok(relay.await?)
}

#[cfg(not(feature = "kafka"))]
async fn relay_from_kafka(
    _config: &LoadConfig,
    _store: Arc<dyn DocumentStore>,
    _settings: RelaySettings,
    _cancel: CancellationToken,
) -> Result<RelayReport> {
    Err(anyhow!(
        "Kafka relay not available. Build with --features=kafka or pass --in-process"
    ))
}

/// Relay fed by an in-process producer over a [`MemoryBroker`]
async fn relay_in_process(
    config: &LoadConfig,
    store: Arc<dyn DocumentStore>,
    settings: RelaySettings,
    cancel: CancellationToken,
) -> Result<RelayReport> {
    let tenants = config.tenants.tenant_ids()?;
    let broker = MemoryBroker::new();
    let topics: Vec<&str> = config
        .relay
        .producer_topics
        .iter()
        .map(String::as_str)
        .collect();
    let consumer = broker.subscribe(&topics);

    let producer = EventProducer::from_config(tenants, &config.relay, Arc::new(broker.clone()));
    let producer = tokio::spawn(producer.run(cancel.clone()));
    let relay = tokio::spawn(
        BatchRelay::new(consumer, store, settings)
            .run(cancel.clone())
            .instrument(relay_span("in-process")),
    );

    wait_for_shutdown(&cancel).await;
    let produced = producer.await?;
    info!(rounds = produced.rounds, sent = produced.sent, "Producer finished");
    Ok(relay.await?)
}

/// Handle `relay`
async fn handle_relay(config: LoadConfig, in_process: bool) -> Result<()> {
    let store = connect_store(&config.backend, &config.relay.database).await?;
    let settings =
        RelaySettings::from_config(&config.relay).with_insert_timeout(config.workload.write_timeout);
    let cancel = CancellationToken::new();

    let report = if in_process {
        relay_in_process(&config, store, settings, cancel).await?
    } else {
        relay_from_kafka(&config, store, settings, cancel).await?
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to format relay report")?
    );
    Ok(())
}

/// Handle `produce`
#[cfg(feature = "kafka")]
async fn handle_produce(config: LoadConfig) -> Result<()> {
    let tenants = config.tenants.tenant_ids()?;
    let producer = tenantload_relay::KafkaProducer::new(&config.relay)
        .context("Failed to create Kafka producer")?;
    let cancel = CancellationToken::new();

    let task = tokio::spawn(
        EventProducer::from_config(tenants, &config.relay, Arc::new(producer)).run(cancel.clone()),
    );
    wait_for_shutdown(&cancel).await;
    let report = task.await?;

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to format producer report")?
    );
    Ok(())
}

#[cfg(not(feature = "kafka"))]
async fn handle_produce(_config: LoadConfig) -> Result<()> {
    Err(anyhow!(
        "Event producer not available. Build with --features=kafka"
    ))
}

/// Handle configuration validation
fn handle_config_validate(config_file: Option<&PathBuf>) -> Result<()> {
    info!("Validating configuration: {:?}", config_file);

    match load_config(config_file, None) {
        Ok(config) => {
            println!("✅ Configuration is valid");
            if !config.tenants.tenants.is_empty() {
                for run in config.run_plan()? {
                    println!(
                        "  {}: {} users, every {:?}",
                        run.tenant, run.user_count, run.pacing_interval
                    );
                }
            }
            Ok(())
        }
        Err(e) => {
            println!("❌ Configuration validation failed: {:#}", e);
            Err(e)
        }
    }
}

/// Handle sample configuration generation
fn handle_config_sample(output: Option<&PathBuf>, force: bool) -> Result<()> {
    let sample = LoadConfig::generate_sample();

    let Some(output) = output else {
        print!("{}", sample);
        return Ok(());
    };

    if output.exists() && !force {
        return Err(anyhow!(
            "Output file already exists: {:?}. Use --force to overwrite.",
            output
        ));
    }
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).context("Failed to create output directory")?;
    }
    fs::write(output, sample).context("Failed to write configuration file")?;

    println!("✅ Sample configuration written to {:?}", output);
    println!(
        "🔧 Validate with: tenantload config validate --config-file {:?}",
        output
    );
    Ok(())
}

/// Handle configuration display
fn handle_config_show(config: &LoadConfig, format: &str) -> Result<()> {
    match format.to_lowercase().as_str() {
        "yaml" | "yml" => {
            let yaml = serde_yaml::to_string(config).context("Failed to serialize to YAML")?;
            println!("{}", yaml);
        }
        "json" => {
            let json =
                serde_json::to_string_pretty(config).context("Failed to serialize to JSON")?;
            println!("{}", json);
        }
        _ => {
            return Err(anyhow!(
                "Unknown output format: {}. Valid formats: yaml, json",
                format
            ));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let Some(command) = &cli.command else {
        // If no subcommand is provided, print help
        use clap::CommandFactory;
        let mut cmd = Cli::command();
        cmd.print_help().context("Failed to print help")?;
        println!();
        return Ok(());
    };

    if let Commands::Config { config_cmd } = command {
        init_simple_tracing(cli.log_level.as_deref().unwrap_or("warn"))?;
        return match config_cmd {
            ConfigCommands::Validate { config_file } => {
                handle_config_validate(config_file.as_ref().or(cli.config.as_ref()))
            }
            ConfigCommands::Sample { output, force } => {
                handle_config_sample(output.as_ref(), *force)
            }
            ConfigCommands::Show { format } => {
                let config = load_config(cli.config.as_ref(), cli.log_level.as_ref())?;
                handle_config_show(&config, format)
            }
        };
    }

    let config = match load_config(cli.config.as_ref(), cli.log_level.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            init_simple_tracing(cli.log_level.as_deref().unwrap_or("info"))?;
            error!("{:#}", e);
            return Err(e);
        }
    };
    init_logging_from_config(&config.logging)?;
    info!(
        tenants = ?config.tenants.tenants,
        backend = %config.backend.uri,
        shutdown_timeout = ?config.workload.shutdown_timeout,
        "tenantload starting"
    );

    match command {
        Commands::Load { seed } => handle_workload(config, WorkloadMode::Full, *seed).await,
        Commands::Read => handle_workload(config, WorkloadMode::ReadOnly, false).await,
        Commands::Seed {
            customers,
            inventory,
        } => handle_seed(config, *customers, *inventory).await,
        Commands::Relay { in_process } => handle_relay(config, *in_process).await,
        Commands::Produce => handle_produce(config).await,
        Commands::Config { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_log_level_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "tenants:\n  tenants: [T1]\n").unwrap();

        let config = load_config(Some(&file.path().to_path_buf()), Some(&"debug".to_string()))
            .unwrap();
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.tenants.tenants, vec!["T1".to_string()]);

        let err = load_config(Some(&file.path().to_path_buf()), Some(&"loud".to_string()));
        assert!(err.is_err());
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let path = PathBuf::from("/nonexistent/tenantload.yaml");
        assert!(load_config(Some(&path), None).is_err());
    }

    #[tokio::test]
    async fn test_connect_store_memory() {
        let store = connect_store(&BackendConfig::memory(), "orderdb").await.unwrap();
        assert_eq!(store.backend_name(), "memory");
    }

    #[test]
    fn test_sample_refuses_to_overwrite() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();
        assert!(handle_config_sample(Some(&path), false).is_err());
        assert!(handle_config_sample(Some(&path), true).is_ok());

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("T1001"));
    }

    #[test]
    fn test_duration_formatting_in_show() {
        let config = LoadConfig::default();
        assert!(handle_config_show(&config, "json").is_ok());
        assert!(handle_config_show(&config, "toml").is_err());
        assert_eq!(config.workload.shutdown_timeout, Duration::from_secs(20));
    }
}
