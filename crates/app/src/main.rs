use log::info;
use num_format::{Locale, ToFormattedString};

use frontier::prelude::*;
use frontier_app::counters::NullCounters;
use frontier_app::options::AppOptions;
use frontier_app::{bfs, page_rank, page_rank_delta, radii};

const USAGE: &str =
    "usage: app <bfs|pagerank|pagerankdelta|radii> [-r <src>] [-maxiters <N>] [-e <events>] [-o] [--new-ids <path>] <input>";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = pico_args::Arguments::from_env();
    let algorithm = args.subcommand()?.ok_or(USAGE)?;
    let options = AppOptions::from_args(&mut args)?;

    let graph: DirectedCsrGraph<u32> = GraphBuilder::new()
        .csr_layout(CsrLayout::Sorted)
        .path(&options.input)
        .build()?;

    info!(
        "Loaded graph (node_count = {}, edge_count = {})",
        (graph.node_count() as usize).to_formatted_string(&Locale::en),
        (graph.edge_count() as usize).to_formatted_string(&Locale::en),
    );

    let new_ids: NewIds<u32> = match &options.new_ids {
        Some(path) => NewIds::from_file(path)?,
        None => NewIds::Identity,
    };

    let mut counters = NullCounters::new(&options.events);

    match algorithm.as_str() {
        "bfs" => {
            let result = bfs::run(&graph, &options, &new_ids, &mut counters)?;
            println!(
                "[OUTPUT] Num. Iters until convergence = {}",
                result.iterations
            );
            println!("[OUTPUT] No. of nodes in BFS-Tree = {}", result.tree_size);
        }
        "pagerank" => {
            let result = page_rank::run(&graph, &options, &new_ids, &mut counters)?;
            println!("[OUTPUT] Num Iters = {}", result.iterations);
            println!("[OUTPUT] L1_Norm   = {}", result.l1_norm);
        }
        "pagerankdelta" => {
            let result = page_rank_delta::run(&graph, &options, &new_ids, &mut counters)?;
            println!("[OUTPUT] Num Iters = {}", result.iterations);
            println!("[OUTPUT] L1_Norm   = {}", result.l1_norm);
        }
        "radii" => {
            let result = radii::run(&graph, &options, &new_ids, &mut counters)?;
            println!("[OUTPUT] Iters until convergence = {}", result.rounds);
        }
        unknown => {
            eprintln!("unknown algorithm: {unknown}");
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    }

    Ok(())
}
