mod signals;

use crate::signals::register_signal_handlers;

use blockmodel::fit::{BlockmodelFitter, FitOptions, InitMethod, Interrupts};
use blockmodel::graph::UndirectedGraph;
use blockmodel::io::{model_writer, OutputFormat};
use blockmodel::Blockmodel;
use clap::Parser;
use log::info;
use matrix_util::common_io::{mkdir, open_buf_writer, STDIO_NAME};
use rayon::ThreadPoolBuilder;
use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Parser, Debug)]
#[command(version, about, long_about)]
/// Fit a stochastic blockmodel to an undirected graph.
///
/// The graph is a whitespace-separated edge list of 0-based vertex ids,
/// one pair per line. On unix, send SIGUSR1 to write the best model found
/// so far, and SIGINT/SIGTERM to finish early.
struct Cli {
    #[arg(
        default_value = STDIO_NAME,
        help = "Edge list file (`-` for stdin)",
        long_help = "Edge list file, one `u v` pair per line. \n\
		     Gzipped files are read transparently; `-` reads standard input."
    )]
    input: Box<str>,

    #[arg(
        short = 'F',
        long = "out-format",
        value_enum,
        default_value = "plain",
        help = "Output format"
    )]
    out_format: OutputFormat,

    #[arg(
        short,
        long,
        default_value = STDIO_NAME,
        help = "Output file (`-` for stdout)",
        long_help = "Output file for the fitted model. \n\
		     A `.gz` extension compresses the output."
    )]
    output: Box<str>,

    #[arg(
        short = 'g',
        long = "groups",
        help = "Number of groups",
        long_help = "Number of groups (types). \n\
		     Chosen by AIC among 2..=floor(sqrt(n)) when not given."
    )]
    num_groups: Option<usize>,

    #[arg(
        short = 's',
        long = "samples",
        default_value_t = 100_000,
        allow_negative_numbers = true,
        help = "Samples taken after convergence",
        long_help = "Number of Metropolis-Hastings steps taken after convergence. \n\
		     Zero or negative keeps sampling until interrupted."
    )]
    num_samples: i64,

    #[arg(long, default_value_t = 65_536, help = "Steps per convergence check")]
    block_size: usize,

    #[arg(
        long,
        value_enum,
        default_value = "greedy",
        help = "Initialisation of the assignment"
    )]
    init_method: InitMethod,

    #[arg(long, default_value_t = 8192, help = "Steps between progress lines")]
    log_period: usize,

    #[arg(
        long,
        help = "Random seed",
        long_help = "Random seed. \n\
		     Derived from the clock when not given; the seed used is logged."
    )]
    seed: Option<u64>,

    #[arg(
        long,
        help = "Largest number of groups tried",
        long_help = "Largest number of groups tried when --groups is not given. \n\
		     Defaults to floor(sqrt(n))."
    )]
    max_groups: Option<usize>,

    #[arg(
        long,
        default_value_t = blockmodel::greedy::DEFAULT_MAX_STEPS,
        help = "Cap on greedy initialisation steps"
    )]
    greedy_max_steps: usize,

    #[arg(long, default_value_t = 16, help = "Maximum number of threads")]
    max_threads: usize,

    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "verbosity",
        long_help = "More output: `-v` for `RUST_LOG=debug`, `-vv` for trace"
    )]
    verbose: u8,

    #[arg(
        short,
        long,
        conflicts_with = "verbose",
        help = "Only warnings and errors"
    )]
    quiet: bool,
}

impl Cli {
    fn log_level(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            _ => "trace",
        }
    }

    fn fit_options(&self) -> FitOptions {
        FitOptions {
            num_groups: self.num_groups,
            max_groups: self.max_groups,
            num_samples: self.num_samples,
            block_size: self.block_size,
            init_method: self.init_method,
            log_period: self.log_period,
            seed: self.seed.unwrap_or_else(clock_seed),
            greedy_max_steps: self.greedy_max_steps,
            ..FitOptions::default()
        }
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", cli.log_level());
    }
    env_logger::init();

    let options = cli.fit_options();
    options.validate()?;

    let max_threads = num_cpus::get().min(cli.max_threads).max(1);
    ThreadPoolBuilder::new()
        .num_threads(max_threads)
        .build_global()?;
    info!("will use {} threads", rayon::current_num_threads());
    info!("random seed: {}", options.seed);

    let graph = UndirectedGraph::read_edge_list(&cli.input)?;

    let interrupts = Interrupts::new();
    register_signal_handlers(&interrupts)?;

    if &*cli.output != STDIO_NAME {
        mkdir(&cli.output)?;
    }

    let writer = model_writer(cli.out_format);
    let output = cli.output.clone();
    let write_model = |model: &Blockmodel<'_>| -> anyhow::Result<()> {
        let mut out = open_buf_writer(&output)?;
        writer.write(model, &mut out)?;
        out.flush()?;
        Ok(())
    };

    let mut on_dump = |model: &Blockmodel<'_>| -> anyhow::Result<()> {
        write_model(model)?;
        info!("wrote the best model so far to {}", output);
        Ok(())
    };

    let outcome = {
        let mut fitter = BlockmodelFitter::new(&graph, options, interrupts, &mut on_dump)?;
        fitter.fit()?
    };

    if outcome.interrupted {
        info!("stopped early; writing the best model found");
    }
    write_model(&outcome.model)?;

    info!("done");
    Ok(())
}
