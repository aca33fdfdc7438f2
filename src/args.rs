use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Stats family to extract from a dump.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Metric {
    /// Page-load timing milestones, in seconds
    Loading,
    /// Third-party V8 execution counters
    V8,
    /// Third-party network request counters
    Req,
}

#[derive(Parser, Debug)]
#[command(
    name = "crawlstats",
    about = "Flatten browser-crawl stats dumps into CSV rows per policy and cache temperature",
    version,
    long_about = None
)]
pub struct Args {
    /// JSON stats dump produced by the crawler
    #[arg(value_name = "JSON_STATS_DUMP")]
    pub dump: PathBuf,

    /// Stats family to extract
    #[arg(short, long, value_enum, default_value_t = Metric::Loading)]
    pub metric: Metric,

    /// Path to a Public Suffix List file
    #[arg(short, long)]
    pub suffix_list: Option<PathBuf>,

    /// Write CSV rows to this file instead of standard output
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["crawlstats", "dump.json"]).unwrap();
        assert_eq!(args.dump, PathBuf::from("dump.json"));
        assert_eq!(args.metric, Metric::Loading);
        assert!(args.suffix_list.is_none());
        assert!(args.output.is_none());
        assert!(!args.verbose);
    }

    #[test]
    fn test_metric_and_paths() {
        let args = Args::try_parse_from([
            "crawlstats",
            "-m",
            "v8",
            "--suffix-list",
            "psl.dat",
            "-o",
            "out.csv",
            "dump.json",
        ])
        .unwrap();
        assert_eq!(args.metric, Metric::V8);
        assert_eq!(args.suffix_list, Some(PathBuf::from("psl.dat")));
        assert_eq!(args.output, Some(PathBuf::from("out.csv")));
    }

    #[test]
    fn test_dump_is_required() {
        assert!(Args::try_parse_from(["crawlstats"]).is_err());
        assert!(Args::try_parse_from(["crawlstats", "-m", "cookies", "dump.json"]).is_err());
    }
}
