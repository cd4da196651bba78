use clap::*;

use aton_receiver::core::aton::*;
use aton_receiver::displays::ProgressDisplay;
use aton_receiver::senders::{SenderOptions, SyntheticSender};
use std::env;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use log::*;

#[derive(Debug, Parser)]
#[clap(author, about, version)]
struct CommandOptions {
    /// Log messages at or above this level (0 -> INFO,
    /// 1 -> WARNING, 2 -> ERROR, 3-> FATAL).
    #[arg(long, value_name = "num", global = true)]
    pub minloglevel: Option<i32>,

    /// Suppress all text output other than error messages.
    #[arg(long, default_value = "false", global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Receive images until a client sends Terminate.
    Listen(ListenOptions),
    /// Stream a procedural test image to a receiver.
    Send(SendOptions),
}

#[derive(Debug, Args)]
struct ListenOptions {
    /// Port to listen on. Default: $ATON_PORT or 9201.
    #[arg(short, long, value_name = "port")]
    pub port: Option<u16>,

    /// JSON file with receiver options.
    #[arg(short, long, value_name = "filename")]
    pub config: Option<PathBuf>,

    /// Keep every AOV instead of the first one only.
    #[arg(long, default_value = "false")]
    pub aovs: bool,

    /// Keep a buffer per frame instead of the latest one only.
    #[arg(long = "multi-frame", default_value = "false")]
    pub multi_frame: bool,
}

#[derive(Debug, Args)]
struct SendOptions {
    /// Receiver address.
    #[arg(long, value_name = "host:port")]
    pub address: Option<String>,

    #[arg(long, default_value = "640")]
    pub width: i32,

    #[arg(long, default_value = "480")]
    pub height: i32,

    #[arg(long = "bucket-size", default_value = "64", value_name = "pixels")]
    pub bucket_size: i32,

    /// AOV names to send.
    #[arg(long, value_delimiter = ',', default_value = "RGBA")]
    pub aovs: Vec<String>,

    /// Frame numbers to send.
    #[arg(long, value_delimiter = ',', default_value = "1")]
    pub frames: Vec<f64>,

    /// Progressive passes per frame.
    #[arg(long, default_value = "1")]
    pub passes: usize,

    /// Stop the receiver when done.
    #[arg(long, default_value = "false")]
    pub terminate: bool,

    /// Use specified number of threads for shading.
    #[arg(short = 'j', long = "nthreads", value_name = "num")]
    pub nthreads: Option<usize>,
}

fn init_logger(opts: &CommandOptions) {
    if let Some(minloglevel) = opts.minloglevel {
        const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
        let log_level = LOG_LEVELS[(minloglevel + 2).clamp(0, 4) as usize];
        env::set_var("RUST_LOG", log_level);
    } else {
        //default log level : warn
        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_owned());
        env::set_var("RUST_LOG", log_level);
    }

    env_logger::Builder::from_default_env()
        .format_target(false)
        .format_module_path(false)
        .init();
}

fn receiver_options(opts: &ListenOptions) -> Result<ReceiverOptions> {
    let mut options = match opts.config.as_ref() {
        Some(path) => ReceiverOptions::from_json_file(path)?,
        None => ReceiverOptions::default(),
    };
    if let Some(port) = opts.port {
        options.port = port;
    }
    if opts.aovs {
        options.aovs_enabled = true;
    }
    if opts.multi_frame {
        options.multi_frame_enabled = true;
    }
    return Ok(options);
}

fn listen(opts: &ListenOptions, quiet: bool) -> Result<()> {
    let options = receiver_options(opts)?;
    let progress = Arc::new(if quiet {
        ProgressDisplay::hidden()
    } else {
        ProgressDisplay::new()
    });
    let mut receiver = Receiver::new(options, progress.clone());
    receiver.start()?;
    if !quiet {
        if let Some(addr) = receiver.local_addr() {
            println!("aton receiver listening on port {}", addr.port());
        }
    }
    receiver.wait();
    progress.done();

    if !quiet {
        for frame in receiver.frames() {
            if let Some(status) = receiver.status_line(frame) {
                println!("{}", status);
            }
        }
    }
    let stats: Vec<FrameStats> = receiver
        .frames()
        .iter()
        .filter_map(|f| receiver.frame_buffer_stats(*f))
        .collect();
    match serde_json::to_string_pretty(&stats) {
        Ok(json) => println!("{}", json),
        Err(e) => warn!("{}", e),
    }
    return Ok(());
}

fn send(opts: &SendOptions, quiet: bool) -> Result<()> {
    if let Some(nthreads) = opts.nthreads {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(nthreads.max(1))
            .build_global()
        {
            warn!("{}", e);
        }
    }
    let options = SenderOptions {
        address: opts
            .address
            .clone()
            .unwrap_or_else(|| format!("127.0.0.1:{}", default_port())),
        width: opts.width,
        height: opts.height,
        bucket_size: opts.bucket_size,
        aovs: opts.aovs.clone(),
        frames: opts.frames.clone(),
        passes: opts.passes,
        terminate: opts.terminate,
        ..SenderOptions::default()
    };
    let sender = SyntheticSender::new(options);
    let summary = sender.run()?;
    if !quiet {
        println!(
            "Sent {} buckets ({} bytes) over {} connections.",
            summary.buckets, summary.bytes, summary.connections
        );
    }
    return Ok(());
}

pub fn main() {
    let opts = CommandOptions::parse();
    init_logger(&opts);
    let r = match &opts.command {
        Command::Listen(listen_opts) => listen(listen_opts, opts.quiet),
        Command::Send(send_opts) => send(send_opts, opts.quiet),
    };
    if let Err(e) = r {
        error!("{}", e);
        process::exit(-1);
    }
}
