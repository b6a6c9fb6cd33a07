//! The register allocator executable.
//!
//! Reads `name start end` live ranges from a file, allocates registers and
//! prints the allocation grouped by register.

use std::{error::Error, fs, process};

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use orzra::reg_alloc::{
    AllocConfig,
    Allocation,
    InterferenceGraph,
    LiveRangeSplitting,
    RegisterAllocator,
    RegisterCoalescing,
    DEFAULT_MAX_ATTEMPTS,
};

fn cli() -> Command {
    Command::new("regalloc")
        .about("Graph coloring register allocation over live ranges")
        .arg(
            Arg::new("input")
                .required(true)
                .help("File with one `name start end` live range per line"),
        )
        .arg(
            Arg::new("registers")
                .short('k')
                .long("registers")
                .required(true)
                .value_parser(value_parser!(usize))
                .help("Number of physical registers"),
        )
        .arg(
            Arg::new("max-attempts")
                .long("max-attempts")
                .value_parser(value_parser!(usize))
                .default_value(DEFAULT_MAX_ATTEMPTS.to_string())
                .help("Coloring attempts before spilling everything"),
        )
        .arg(
            Arg::new("coalesce")
                .long("coalesce")
                .value_name("A:B")
                .action(ArgAction::Append)
                .help("Coalesce B into A before allocation"),
        )
        .arg(
            Arg::new("split")
                .long("split")
                .value_name("NAME@POINT")
                .action(ArgAction::Append)
                .help("Split NAME at POINT before allocation"),
        )
        .arg(
            Arg::new("interference")
                .long("interference")
                .action(ArgAction::SetTrue)
                .help("Print the interferences of each variable"),
        )
        .arg(
            Arg::new("mermaid")
                .long("mermaid")
                .action(ArgAction::SetTrue)
                .help("Print the interference graph as a mermaid diagram"),
        )
}

fn parse_live_ranges(src: &str) -> Result<Vec<(String, i64, i64)>, String> {
    let mut ranges = Vec::new();
    for (lineno, line) in src.lines().enumerate() {
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        let fields = line.split_whitespace().collect::<Vec<_>>();
        let [name, start, end] = fields[..] else {
            return Err(format!(
                "line {}: expected `name start end`, got `{}`",
                lineno + 1,
                line
            ));
        };
        let parse_point = |s: &str| {
            s.parse::<i64>()
                .map_err(|err| format!("line {}: bad program point `{}`: {}", lineno + 1, s, err))
        };
        ranges.push((name.to_string(), parse_point(start)?, parse_point(end)?));
    }
    Ok(ranges)
}

fn parse_coalesce(arg: &str) -> Result<(String, String), String> {
    match arg.split_once(':') {
        Some((a, b)) if !a.is_empty() && !b.is_empty() => Ok((a.to_string(), b.to_string())),
        _ => Err(format!("bad coalesce request `{}`, expected A:B", arg)),
    }
}

fn parse_split(arg: &str) -> Result<(String, i64), String> {
    let bad = || format!("bad split request `{}`, expected NAME@POINT", arg);
    let (name, point) = arg.rsplit_once('@').ok_or_else(bad)?;
    if name.is_empty() {
        return Err(bad());
    }
    let point = point.parse::<i64>().map_err(|_| bad())?;
    Ok((name.to_string(), point))
}

fn report(allocation: &Allocation, registers: usize) -> String {
    let mut s = String::new();
    s.push_str("Register Allocation Results:\n");
    s.push_str(&"-".repeat(40));
    s.push('\n');
    for (register, names) in allocation.by_register(registers).iter().enumerate() {
        if names.is_empty() {
            s.push_str(&format!("Register {}: (empty)\n", register));
        } else {
            s.push_str(&format!("Register {}: {}\n", register, names.join(", ")));
        }
    }
    let spilled = allocation.spilled();
    if spilled.is_empty() {
        s.push_str("Spilled Variables: (none)\n");
    } else {
        s.push_str(&format!("Spilled Variables: {}\n", spilled.join(", ")));
    }
    s
}

fn interference_report(graph: &InterferenceGraph) -> String {
    let mut s = String::new();
    s.push_str("Interference Information:\n");
    s.push_str(&"-".repeat(24));
    s.push('\n');
    for var in graph.vars_by_name() {
        let Some(data) = graph.variable(var) else {
            continue;
        };
        let mut others = graph
            .neighbors(var)
            .filter_map(|other| graph.name(other))
            .collect::<Vec<_>>();
        others.sort_unstable();
        let others = if others.is_empty() {
            "none".to_string()
        } else {
            others.join(", ")
        };
        s.push_str(&format!(
            "Variable {} {} interferes with: {}\n",
            data.name(),
            data.range(),
            others
        ));
    }
    s
}

fn run(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let input = matches
        .get_one::<String>("input")
        .ok_or("missing input file")?;
    let registers = *matches
        .get_one::<usize>("registers")
        .ok_or("missing register count")?;
    let max_attempts = matches
        .get_one::<usize>("max-attempts")
        .copied()
        .unwrap_or(DEFAULT_MAX_ATTEMPTS);
    let config = AllocConfig::new(registers)?.with_max_attempts(max_attempts);

    let src = fs::read_to_string(input)?;
    let live_ranges = parse_live_ranges(&src)?;
    let mut graph = InterferenceGraph::build_from_live_ranges(&live_ranges)?;

    if let Some(requests) = matches.get_many::<String>("coalesce") {
        let pairs = requests
            .map(|arg| parse_coalesce(arg))
            .collect::<Result<Vec<_>, _>>()?;
        let merged = RegisterCoalescing::coalesce_all(&mut graph, &pairs);
        log::info!("coalesced {} of {} pairs", merged, pairs.len());
    }

    if let Some(requests) = matches.get_many::<String>("split") {
        for arg in requests {
            let (name, point) = parse_split(arg)?;
            LiveRangeSplitting::split_range(&mut graph, &name, point)?;
        }
    }

    let interference = interference_report(&graph);
    let mermaid = graph.to_mermaid();

    println!(
        "Allocating registers for {} variables using {} registers...\n",
        graph.len(),
        registers
    );
    let allocation = RegisterAllocator::new(graph, config).run();
    print!("{}", report(&allocation, registers));

    if allocation.exhausted() {
        println!(
            "\nNo valid coloring after {} attempts, all variables spilled.",
            allocation.attempts()
        );
    }
    if matches.get_flag("interference") {
        print!("\n{}", interference);
    }
    if matches.get_flag("mermaid") {
        print!("\n{}", mermaid);
    }
    Ok(())
}

fn main() {
    env_logger::init();

    let matches = cli().get_matches();
    if let Err(err) = run(&matches) {
        eprintln!("error: {}", err);
        process::exit(1);
    }
}
