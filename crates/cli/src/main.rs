use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use vecstore_core::config;
use vecstore_core::hnsw::{level_histogram, HnswConfig, HnswIndex, IndexItem, SimilarityMetric};
use vecstore_core::storage::{FileBackend, StorageBackend, VectorStore};

#[derive(Parser)]
#[command(name = "vecstore", about = "Embeddable HNSW vector index", version)]
struct Args {
    /// Emit logs as JSON lines
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct Location {
    /// Data directory for persistence
    #[arg(short, long, default_value = config::DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Collection name
    #[arg(short, long)]
    collection: String,
}

#[derive(clap::Args)]
struct GraphArgs {
    /// Maximum neighbors per node per layer
    #[arg(long, default_value_t = config::HNSW_DEFAULT_M)]
    m: usize,

    /// Construction candidate width (stored with the index)
    #[arg(long, default_value_t = config::HNSW_DEFAULT_EF_CONSTRUCTION)]
    ef_construction: usize,

    /// Similarity metric: cosine or euclidean
    #[arg(long, default_value = "cosine")]
    metric: SimilarityMetric,

    /// Seed for level sampling (random when omitted)
    #[arg(long)]
    seed: Option<u64>,
}

impl GraphArgs {
    fn config(&self) -> HnswConfig {
        HnswConfig {
            m: self.m,
            ef_construction: self.ef_construction,
            metric: self.metric,
            dimension: None,
            seed: self.seed,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Build an index from a JSON-lines file of {id, embedding, content} and save it
    Build {
        #[command(flatten)]
        location: Location,

        /// Input file, one JSON object per line
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        graph: GraphArgs,
    },

    /// Load a saved index and print the nearest neighbors of a vector as JSON
    Query {
        #[command(flatten)]
        location: Location,

        /// Comma-separated query vector, e.g. "0.1,0.2,0.3"
        #[arg(long, value_parser = parse_vector)]
        vector: ::std::vec::Vec<f32>,

        /// Number of results
        #[arg(short, default_value_t = config::DEFAULT_K)]
        k: usize,
    },

    /// Build an index over random vectors and report timings
    Bench {
        /// Number of vectors
        #[arg(long, default_value_t = 10_000)]
        size: u32,

        /// Vector dimension
        #[arg(long, default_value_t = 64)]
        dim: usize,

        /// Number of results per query
        #[arg(short, default_value_t = 10)]
        k: usize,

        /// Number of queries to time
        #[arg(long, default_value_t = 1_000)]
        queries: usize,

        #[command(flatten)]
        graph: GraphArgs,

        /// Write the snapshot JSON to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Delete a saved index
    Delete {
        #[command(flatten)]
        location: Location,
    },
}

fn parse_vector(s: &str) -> Result<Vec<f32>, String> {
    s.split(',')
        .map(|part| {
            part.trim()
                .parse::<f32>()
                .map_err(|e| format!("invalid component '{}': {}", part.trim(), e))
        })
        .collect()
}

fn open_store(location: &Location, config: HnswConfig) -> Result<VectorStore, Box<dyn std::error::Error>> {
    let backend: Arc<dyn StorageBackend> = Arc::new(FileBackend::new(&location.data_dir));
    Ok(VectorStore::open(&location.collection, config, backend, None)?)
}

fn read_items(path: &PathBuf) -> Result<Vec<IndexItem>, Box<dyn std::error::Error>> {
    let reader = BufReader::new(File::open(path)?);
    let mut items = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let item: IndexItem = serde_json::from_str(&line)
            .map_err(|e| format!("{}:{}: {}", path.display(), lineno + 1, e))?;
        items.push(item);
    }
    Ok(items)
}

fn build(location: &Location, input: &PathBuf, graph: &GraphArgs) -> Result<(), Box<dyn std::error::Error>> {
    let items = read_items(input)?;
    tracing::info!("Read {} items from {:?}", items.len(), input);

    let store = open_store(location, graph.config())?;
    let t0 = Instant::now();
    let count = store.build_index(items)?;
    let build_secs = t0.elapsed().as_secs_f64();
    store.save_index()?;

    let meta = store.index_meta();
    println!(
        "{}",
        serde_json::json!({
            "collection": location.collection,
            "vectors": count,
            "dimension": meta.dimension,
            "metric": meta.metric,
            "entryPoint": meta.entry_point,
            "buildSeconds": build_secs,
        })
    );
    Ok(())
}

fn query(location: &Location, vector: &[f32], k: usize) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(location, HnswConfig::default())?;
    store.load_index()?;
    let results = store.query(vector, k)?;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

fn bench(
    size: u32,
    dim: usize,
    k: usize,
    queries: usize,
    graph: &GraphArgs,
    output: Option<&PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    if dim == 0 {
        return Err("dimension must be greater than 0".into());
    }
    let mut rng = match graph.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let items: Vec<IndexItem> = (0..size)
        .map(|id| {
            let embedding = (0..dim).map(|_| rng.gen_range(-1.0f32..1.0)).collect();
            IndexItem::new(id, embedding, None)
        })
        .collect();

    let mut index = HnswIndex::new(graph.config())?;
    let t0 = Instant::now();
    index.build_index(items)?;
    let build_time = t0.elapsed();

    let targets: Vec<Vec<f32>> = (0..queries)
        .map(|_| (0..dim).map(|_| rng.gen_range(-1.0f32..1.0)).collect())
        .collect();
    let t0 = Instant::now();
    let mut returned = 0usize;
    for target in &targets {
        returned += index.query(target, k)?.len();
    }
    let query_time = t0.elapsed();

    let snapshot = index.to_snapshot();
    println!(
        "{}",
        serde_json::json!({
            "size": size,
            "dim": dim,
            "metric": graph.metric,
            "M": graph.m,
            "buildSeconds": build_time.as_secs_f64(),
            "insertsPerSecond": size as f64 / build_time.as_secs_f64(),
            "queries": queries,
            "queriesPerSecond": queries as f64 / query_time.as_secs_f64(),
            "avgResults": returned as f64 / queries.max(1) as f64,
            "topLevel": index.top_level(),
            "levels": level_histogram(&snapshot),
        })
    );

    if let Some(path) = output {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, &snapshot)?;
        writer.flush()?;
        tracing::info!("Wrote snapshot to {:?}", path);
    }
    Ok(())
}

fn delete(location: &Location) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(location, HnswConfig::default())?;
    store.delete_index()?;
    println!("deleted collection '{}'", location.collection);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = EnvFilter::from_default_env()
        .add_directive("vecstore_core=info".parse()?)
        .add_directive("vecstore=info".parse()?);
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if args.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match &args.command {
        Command::Build {
            location,
            input,
            graph,
        } => build(location, input, graph),
        Command::Query {
            location,
            vector,
            k,
        } => query(location, vector, *k),
        Command::Bench {
            size,
            dim,
            k,
            queries,
            graph,
            output,
        } => bench(*size, *dim, *k, *queries, graph, output.as_ref()),
        Command::Delete { location } => delete(location),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vector() {
        assert_eq!(parse_vector("1,2.5, -3").unwrap(), vec![1.0, 2.5, -3.0]);
        assert!(parse_vector("1,,2").is_err());
        assert!(parse_vector("a").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "vecstore", "build", "--collection", "docs", "--input", "in.jsonl", "--metric",
            "euclidean", "--m", "8",
        ])
        .unwrap();
        match args.command {
            Command::Build { location, graph, .. } => {
                assert_eq!(location.collection, "docs");
                assert_eq!(location.data_dir, PathBuf::from(config::DEFAULT_DATA_DIR));
                assert_eq!(graph.metric, SimilarityMetric::Euclidean);
                assert_eq!(graph.m, 8);
                assert_eq!(graph.ef_construction, 200);
            }
            _ => panic!("expected build"),
        }
    }

    #[test]
    fn test_query_args_parse() {
        let args = Args::try_parse_from([
            "vecstore", "query", "--collection", "docs", "--vector", "1,2,3", "-k", "2",
        ])
        .unwrap();
        match args.command {
            Command::Query {
                location,
                vector,
                k,
            } => {
                assert_eq!(location.collection, "docs");
                assert_eq!(vector, vec![1.0, 2.0, 3.0]);
                assert_eq!(k, 2);
            }
            _ => panic!("expected query"),
        }

        let args =
            Args::try_parse_from(["vecstore", "query", "-c", "docs", "--vector", "0.5"]).unwrap();
        match args.command {
            Command::Query { vector, k, .. } => {
                assert_eq!(vector, vec![0.5]);
                assert_eq!(k, config::DEFAULT_K);
            }
            _ => panic!("expected query"),
        }

        assert!(Args::try_parse_from([
            "vecstore", "query", "-c", "docs", "--vector", "1,x"
        ])
        .is_err());
    }

    #[test]
    fn test_bench_args_parse() {
        let args = Args::try_parse_from([
            "vecstore", "bench", "--size", "500", "--dim", "8", "-k", "5", "--seed", "3",
            "--output", "snap.json",
        ])
        .unwrap();
        match args.command {
            Command::Bench {
                size,
                dim,
                k,
                queries,
                graph,
                output,
            } => {
                assert_eq!(size, 500);
                assert_eq!(dim, 8);
                assert_eq!(k, 5);
                assert_eq!(queries, 1_000);
                assert_eq!(graph.seed, Some(3));
                assert_eq!(graph.metric, SimilarityMetric::Cosine);
                assert_eq!(output, Some(PathBuf::from("snap.json")));
            }
            _ => panic!("expected bench"),
        }
    }

    #[test]
    fn test_delete_args_parse() {
        let args = Args::try_parse_from([
            "vecstore", "--log-json", "delete", "--data-dir", "/tmp/vs", "--collection", "docs",
        ])
        .unwrap();
        assert!(args.log_json);
        match args.command {
            Command::Delete { location } => {
                assert_eq!(location.data_dir, PathBuf::from("/tmp/vs"));
                assert_eq!(location.collection, "docs");
            }
            _ => panic!("expected delete"),
        }
    }

    #[test]
    fn test_read_items() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("items.jsonl");
        std::fs::write(
            &path,
            "{\"id\": 1, \"embedding\": [1.0, 2.0], \"content\": \"a\"}\n\n{\"id\": 2, \"embedding\": [0.5, 0.1]}\n",
        )
        .unwrap();
        let items = read_items(&path).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].content.as_deref(), Some("a"));
        assert_eq!(items[1].content, None);

        std::fs::write(&path, "{\"id\": 1}\n").unwrap();
        assert!(read_items(&path).unwrap_err().to_string().contains(":1:"));
    }
}
