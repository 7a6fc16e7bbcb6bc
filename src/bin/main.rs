use std::io::Write;

use bgproutes_live::session::{DEFAULT_STREAM_URL, DEFAULT_SUBSCRIBE_URL};
use bgproutes_live::{RouteUpdate, SessionBuilder};
use clap::Parser;
use log::{info, Level};

/// bgproutes-live streams real-time BGP updates for a set of prefixes.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Opts {
    /// API key of the feed
    #[clap(long, env = "BGP_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Prefix to subscribe to. Repeat the option or pass a comma-separated list.
    #[clap(short = 'p', long = "prefix", value_delimiter = ',')]
    prefixes: Vec<String>,

    /// Websocket endpoint of the feed
    #[clap(long, default_value = DEFAULT_STREAM_URL)]
    stream_url: String,

    /// Base URL of the prefix subscription service
    #[clap(long, default_value = DEFAULT_SUBSCRIBE_URL)]
    subscribe_url: String,

    /// Output as JSON objects
    #[clap(long)]
    json: bool,

    /// Output as PSV entries with header
    #[clap(long)]
    psv: bool,

    /// Pretty-print JSON output
    #[clap(long)]
    pretty: bool,

    /// Count updates until the stream ends instead of printing them
    #[clap(short, long)]
    count: bool,

    /// Log skipped frames; repeat for more detail
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[clap(flatten)]
    filters: Filters,
}

#[derive(Parser, Debug)]
struct Filters {
    /// Filter by update kind: announce (a) or withdraw (w)
    #[clap(short = 'm', long)]
    kind: Option<String>,

    /// Filter by vantage point AS number
    #[clap(short = 'J', long)]
    vp_asn: Option<u32>,

    /// Filter by vantage point IP address
    #[clap(short = 'j', long)]
    vp_ip: Option<String>,

    /// Filter by exact prefix among the update's prefixes
    #[clap(short = 'P', long = "filter-prefix")]
    prefix: Option<String>,

    /// Filter by origin AS number
    #[clap(short = 'o', long)]
    origin_asn: Option<u32>,

    /// Filter by start unix timestamp inclusive
    #[clap(short = 't', long)]
    start_ts: Option<f64>,

    /// Filter by end unix timestamp inclusive
    #[clap(short = 'T', long)]
    end_ts: Option<f64>,

    /// Filter by AS path regex string
    #[clap(short = 'a', long)]
    as_path: Option<String>,
}

impl Filters {
    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![];
        if let Some(v) = &self.kind {
            pairs.push(("kind", v.clone()));
        }
        if let Some(v) = self.vp_asn {
            pairs.push(("vp_asn", v.to_string()));
        }
        if let Some(v) = &self.vp_ip {
            pairs.push(("vp_ip", v.clone()));
        }
        if let Some(v) = &self.prefix {
            pairs.push(("prefix", v.clone()));
        }
        if let Some(v) = self.origin_asn {
            pairs.push(("origin_asn", v.to_string()));
        }
        if let Some(v) = self.start_ts {
            pairs.push(("ts_start", v.to_string()));
        }
        if let Some(v) = self.end_ts {
            pairs.push(("ts_end", v.to_string()));
        }
        if let Some(v) = &self.as_path {
            pairs.push(("as_path", v.clone()));
        }
        pairs
    }
}

fn exit_with(msg: impl std::fmt::Display) -> ! {
    eprintln!("{}", msg);
    std::process::exit(1);
}

fn main() {
    let opts: Opts = Opts::parse();

    let default_level = match opts.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mut builder = SessionBuilder::new(opts.api_key.as_str())
        .stream_url(opts.stream_url.as_str())
        .subscribe_url(opts.subscribe_url.as_str())
        .diagnostic_level(Level::Info);
    for (filter_type, value) in opts.filters.to_pairs() {
        builder = match builder.add_filter(filter_type, value.as_str()) {
            Ok(b) => b,
            Err(e) => exit_with(e),
        };
    }
    let session = builder.build();

    let prefixes: Vec<String> = opts
        .prefixes
        .iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    if let Err(e) = session.subscribe(prefixes) {
        exit_with(e);
    }

    let cancel = session.cancel_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("interrupt received, stopping after the current frame");
        cancel.cancel();
    }) {
        exit_with(e);
    }

    let mut stdout = std::io::stdout();
    let mut count: usize = 0;
    for update in session {
        let update = match update {
            Ok(u) => u,
            Err(e) => {
                if opts.count {
                    println!("total updates: {}", count);
                }
                exit_with(e);
            }
        };

        if opts.count {
            count += 1;
            continue;
        }

        let output_str = if opts.json {
            let res = if opts.pretty {
                serde_json::to_string_pretty(&update)
            } else {
                serde_json::to_string(&update)
            };
            match res {
                Ok(s) => s,
                Err(e) => exit_with(e),
            }
        } else if opts.psv && count == 0 {
            format!("{}\n{}", RouteUpdate::get_psv_header(), update.to_psv())
        } else {
            update.to_psv()
        };
        count += 1;

        if let Err(e) = writeln!(stdout, "{}", &output_str) {
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                eprintln!("{}", e);
            }
            std::process::exit(1);
        }
    }

    if opts.count {
        println!("total updates: {}", count);
    }
}
