//! Subcommands of the `genrepo` binary.

use std::path::PathBuf;
use std::pin::pin;

use anyhow::{anyhow, bail, Context, Result};
use futures_util::StreamExt;

use genrepo::storage::dynamodb::{create_client, DynamoDbStore};
use genrepo::{GenericRepository, RepositoryConfig, SaveOptions};
use genrepo_core::filter::{apply, Filter};
use genrepo_core::record::{record_from_json, record_to_json, Record, Value};
use genrepo_core::storage::RepositoryError;

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Load one item by key
    Get {
        /// Partition key value, or a JSON object with the full key
        key: String,
    },

    /// Save one item (the item must contain its key attributes)
    Put {
        /// Item as a JSON object
        item: String,

        /// Do not stamp the expiration attribute
        #[arg(long)]
        no_expiration: bool,
    },

    /// Delete one item by key
    Delete {
        /// Partition key value, or a JSON object with the full key
        key: String,
    },

    /// Delete every item in a partition
    DeletePartition {
        /// Partition key value
        value: String,
    },

    /// List items in a partition, or in an index when --index is given
    Query {
        /// Key value to match
        value: String,

        /// Secondary index to query
        #[arg(long, requires = "key_name")]
        index: Option<String>,

        /// Index key attribute (required with --index)
        #[arg(long, requires = "index")]
        key_name: Option<String>,

        /// Filter as a JSON object
        #[arg(long, short)]
        filter: Option<String>,

        /// Print only the first match
        #[arg(long)]
        first: bool,
    },

    /// Stream every item in the table as JSON lines
    Scan {
        /// Filter as a JSON object
        #[arg(long, short)]
        filter: Option<String>,

        /// Stop after this many matching items
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print the approximate item count
    Count,

    /// Set attributes on an item, optionally only when a condition holds
    Update {
        /// Partition key value, or a JSON object with the full key
        key: String,

        /// Attributes to set, as a JSON object
        #[arg(long)]
        set: String,

        /// Condition as a JSON filter object
        #[arg(long)]
        condition: Option<String>,

        /// Message reported when the condition fails
        #[arg(long)]
        rejection_message: Option<String>,
    },

    /// Apply a filter to a JSON array of records, without touching any table
    Filter(FilterArgs),
}

#[derive(Debug, clap::Args)]
pub struct FilterArgs {
    /// JSON file holding an array of objects ("-" reads stdin)
    input: PathBuf,

    /// Filter as a JSON object
    #[arg(long, short)]
    filter: String,
}

/// Runs a command against the configured DynamoDB table.
pub async fn run(command: Command, config: &RepositoryConfig) -> Result<()> {
    let client = create_client(config).await;
    let store = DynamoDbStore::new(client, &config.table_name);
    let repo = GenericRepository::from_config(store, config);

    match command {
        Command::Get { key } => {
            let item = match parse_key(&key)? {
                KeyArg::Partition(value) => repo.load(value).await?,
                KeyArg::Full(key) => repo.load_by_composite_key(&key).await?,
            };
            match item {
                Some(item) => print_json(&record_to_json(&item))?,
                None => bail!("Key not found in table {}: {}", repo.table_name(), key),
            }
        }
        Command::Put {
            item,
            no_expiration,
        } => {
            let item = parse_record(&item).context("invalid item")?;
            let options = SaveOptions {
                return_model: true,
                set_expiration: !no_expiration,
            };
            match repo.save_with_composite_key(item, options).await? {
                Some(item) => print_json(&record_to_json(&item))?,
                None => tracing::info!("Nothing written"),
            }
        }
        Command::Delete { key } => match parse_key(&key)? {
            KeyArg::Partition(value) => repo.delete(value).await?,
            KeyArg::Full(key) => repo.delete_by_composite_key(&key).await?,
        },
        Command::DeletePartition { value } => {
            let deleted = repo.delete_all_by_primary_key(parse_scalar(&value)).await?;
            print_json(&serde_json::json!({ "deleted": deleted }))?;
        }
        Command::Query {
            value,
            index,
            key_name,
            filter,
            first,
        } => {
            let filter = parse_filter(filter.as_deref())?;
            let value = parse_scalar(&value);
            let mut items = match (index, key_name) {
                (Some(index), Some(key_name)) => {
                    repo.find_all_with_index(&index, &key_name, value, &filter)
                        .await?
                }
                _ => repo.find_all(value, &filter).await?,
            };
            if first {
                items.truncate(1);
            }
            print_json(&records_to_json(&items))?;
        }
        Command::Scan { filter, limit } => {
            let filter = parse_filter(filter.as_deref())?;
            let mut stream = pin!(repo.load_all(&filter).take(limit.unwrap_or(usize::MAX)));
            while let Some(item) = stream.next().await {
                println!("{}", record_to_json(&item?));
            }
        }
        Command::Count => {
            print_json(&serde_json::json!({ "count": repo.count().await? }))?;
        }
        Command::Update {
            key,
            set,
            condition,
            rejection_message,
        } => {
            let updates = parse_record(&set).context("invalid --set")?;
            let condition = parse_filter(condition.as_deref())?;
            let result = match parse_key(&key)? {
                KeyArg::Partition(value) => {
                    repo.update(value, updates, Some(&condition), rejection_message.as_deref())
                        .await
                }
                KeyArg::Full(key) => {
                    repo.update_by_composite_key(
                        &key,
                        updates,
                        Some(&condition),
                        rejection_message.as_deref(),
                    )
                    .await
                }
            };
            match result {
                Ok(Some(item)) => print_json(&record_to_json(&item))?,
                Ok(None) => tracing::info!("Nothing written"),
                Err(err @ RepositoryError::ConditionFailed(_)) => {
                    print_json(&rejection_report(&err))?;
                    return Err(err.into());
                }
                Err(err) => return Err(err.into()),
            }
        }
        Command::Filter(args) => return run_filter(args),
    }

    Ok(())
}

/// Filters records read from a file or stdin and prints the matches.
pub fn run_filter(args: FilterArgs) -> Result<()> {
    let input = if args.input.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin()).context("failed to read stdin")?
    } else {
        std::fs::read_to_string(&args.input)
            .with_context(|| format!("failed to read {}", args.input.display()))?
    };
    let filter = parse_filter(Some(&args.filter))?;
    let matched = filter_json_records(&input, &filter)?;
    print_json(&serde_json::Value::Array(matched))
}

/// Parses a JSON array of objects and keeps those matching `filter`.
pub fn filter_json_records(input: &str, filter: &Filter) -> Result<Vec<serde_json::Value>> {
    let json: serde_json::Value = serde_json::from_str(input).context("input is not JSON")?;
    let serde_json::Value::Array(items) = json else {
        bail!("input must be a JSON array of objects");
    };

    let records = items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            record_from_json(item).ok_or_else(|| anyhow!("element {} is not an object", i))
        })
        .collect::<Result<Vec<Record>>>()?;

    Ok(apply(&records, filter).map(record_to_json).collect())
}

/// A key argument: a bare partition value or a full key object.
#[derive(Debug, PartialEq)]
pub enum KeyArg {
    Partition(Value),
    Full(Record),
}

/// JSON objects are full keys; anything else is a partition key value.
pub fn parse_key(arg: &str) -> Result<KeyArg> {
    match serde_json::from_str::<serde_json::Value>(arg) {
        Ok(json @ serde_json::Value::Object(_)) => record_from_json(json)
            .map(KeyArg::Full)
            .ok_or_else(|| anyhow!("invalid key object")),
        _ => Ok(KeyArg::Partition(parse_scalar(arg))),
    }
}

/// JSON numbers and quoted strings are parsed; other text is taken verbatim.
pub fn parse_scalar(arg: &str) -> Value {
    match serde_json::from_str::<serde_json::Value>(arg) {
        Ok(json @ (serde_json::Value::Number(_) | serde_json::Value::String(_))) => {
            Value::from(json)
        }
        _ => Value::from(arg),
    }
}

fn parse_record(arg: &str) -> Result<Record> {
    let json: serde_json::Value = serde_json::from_str(arg)?;
    record_from_json(json).ok_or_else(|| anyhow!("expected a JSON object"))
}

fn parse_filter(arg: Option<&str>) -> Result<Filter> {
    let Some(arg) = arg else {
        return Ok(Filter::new());
    };
    let json: serde_json::Value = serde_json::from_str(arg).context("filter is not JSON")?;
    Ok(Filter::parse(&json)?)
}

/// Report printed when a conditional update is rejected.
fn rejection_report(err: &RepositoryError) -> serde_json::Value {
    serde_json::json!({
        "success": false,
        "error_code": err.code(),
        "message": err.to_string(),
    })
}

fn records_to_json(records: &[Record]) -> serde_json::Value {
    serde_json::Value::Array(records.iter().map(record_to_json).collect())
}

fn print_json(json: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(json)?);
    Ok(())
}
