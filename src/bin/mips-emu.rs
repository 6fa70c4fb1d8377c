use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use mips_ensemble::ast::Reg;
use mips_ensemble::sim::debug::{Breakpoint, MemView};
use mips_ensemble::sim::mem::MachineInitStrategy;
use mips_ensemble::sim::{SimFlags, Simulator};

/// A program file and the address it is loaded at.
#[derive(Clone, Debug)]
struct LoadArg {
    path: PathBuf,
    addr: u32,
}

/// Parses decimal, or hex with a `0x` prefix.
fn parse_num(s: &str) -> Result<u32, String> {
    let result = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    result.map_err(|e| format!("invalid number {s:?}: {e}"))
}

fn parse_size(s: &str) -> Result<usize, String> {
    parse_num(s).map(|n| n as usize)
}

fn parse_load(s: &str) -> Result<LoadArg, String> {
    match s.rsplit_once('@') {
        Some((path, addr)) => Ok(LoadArg { path: path.into(), addr: parse_num(addr)? }),
        None => Ok(LoadArg { path: s.into(), addr: 0 }),
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Run assembled MIPS machine words"
)]
struct Opts {
    /// Program file to load, optionally at an address (FILE@ADDR)
    #[arg(short, long, value_name = "FILE[@ADDR]", value_parser = parse_load, required = true)]
    load: Vec<LoadArg>,
    /// Address to start executing at
    #[arg(long, value_parser = parse_num)]
    pc: Option<u32>,
    /// Maximum number of instructions to run
    #[arg(long, default_value_t = 1_000_000)]
    max_steps: u64,
    /// Stop once the pc reaches this address
    #[arg(long, value_name = "ADDR", value_parser = parse_num)]
    until: Option<u32>,
    /// Size of memory in bytes
    #[arg(long, value_parser = parse_size, default_value = "0x10000")]
    mem_size: usize,
    /// Fill memory and registers from a seeded RNG instead of zeroes
    #[arg(long)]
    seed: Option<u64>,
    /// Print the final machine state as JSON
    #[arg(long)]
    json: bool,
    /// Start the command loop instead of running
    #[arg(short, long)]
    interactive: bool,
}

fn print_regs(sim: &Simulator) {
    let regs = sim.reg_file.as_array();
    println!("pc = {:#010x}  ({} instructions run)", sim.pc, sim.instructions_run);
    for row in Reg::all().collect::<Vec<_>>().chunks(4) {
        let line: Vec<_> = row.iter()
            .map(|&r| format!("{:>5} = {:#010x}", r.to_string(), regs[usize::from(r)]))
            .collect();
        println!("{}", line.join("  "));
    }
}

fn print_view(sim: &Simulator, view: &MemView) {
    match sim.current_instr() {
        Some(instr) => println!("next: {instr}"),
        None => println!("next: <pc {:#010x} is outside memory>", sim.pc),
    }
    for row in view.rows(sim) {
        let marker = if row.is_pc { "->" } else { "  " };
        println!("{marker} {:#010x}  {:08x}  {}", row.addr, row.word, row.instr());
    }
}

const HELP: &str = "\
commands:
  n            execute the next instruction
  j <addr>     move the pc
  m <addr>     move the memory view
  l <file> <addr>  load a program file
  w / s        scroll the memory view up / down
  r            show registers
  h            show this help
  q            quit";

fn interactive(sim: &mut Simulator) -> Result<()> {
    let mut view = MemView::default();
    view.follow(sim.pc, sim);
    print_view(sim, &view);

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut line = String::new();
    loop {
        print!("> ");
        stdout.flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 { break };

        let command: Vec<_> = line.split_whitespace().collect();
        match command.as_slice() {
            ["n"] => {
                match sim.step_in() {
                    Ok(()) => {
                        for r in sim.observer.modified_regs() {
                            println!("{r} = {:#010x}", sim.reg_file[r]);
                        }
                    },
                    Err(e) => eprintln!("error: {e}"),
                }
                view.follow(sim.pc, sim);
            },
            ["j", addr] => match parse_num(addr) {
                Ok(addr) => match sim.jump_to(addr) {
                    Ok(()) => view.follow(addr, sim),
                    Err(e) => eprintln!("error: {e}"),
                },
                Err(e) => eprintln!("error: {e}"),
            },
            ["m", addr] => match parse_num(addr) {
                Ok(addr) => if let Err(e) = view.jump(addr, sim) { eprintln!("error: {e}") },
                Err(e) => eprintln!("error: {e}"),
            },
            ["l", path, addr] => match parse_num(addr) {
                Ok(addr) => match sim.load_file(path, addr) {
                    Ok(n) => println!("loaded {n} words at {addr:#010x}"),
                    Err(e) => eprintln!("error: {e}"),
                },
                Err(e) => eprintln!("error: {e}"),
            },
            ["w"] => view.scroll_up(),
            ["s"] => view.scroll_down(sim),
            ["r"] => {
                print_regs(sim);
                continue;
            },
            ["h"] => {
                println!("{HELP}");
                continue;
            },
            ["q"] => break,
            [] => continue,
            _ => {
                eprintln!("unknown command, h for help");
                continue;
            }
        }
        print_view(sim, &view);
    }

    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    let machine_init = match opts.seed {
        Some(seed) => MachineInitStrategy::Seeded { seed },
        None => MachineInitStrategy::default(),
    };
    let mut sim = Simulator::new(SimFlags {
        mem_size: opts.mem_size,
        machine_init,
        ..Default::default()
    });

    for load in &opts.load {
        sim.load_file(&load.path, load.addr)
            .with_context(|| format!("cannot load {} at {:#010x}", load.path.display(), load.addr))?;
    }
    if let Some(pc) = opts.pc {
        sim.jump_to(pc).context("invalid start address")?;
    }
    if let Some(until) = opts.until {
        sim.breakpoints.insert(Breakpoint::PC(until));
    }

    if opts.interactive {
        return interactive(&mut sim);
    }

    let result = sim.run_with_limit(opts.max_steps);
    match opts.json {
        true  => println!("{}", serde_json::to_string_pretty(&sim.snapshot())?),
        false => print_regs(&sim),
    }

    if let Err(e) = result {
        match sim.mem.read_word(sim.pc) {
            Some(word) => eprintln!("error: {e}\n  at pc {:#010x} (word {word:#010x})", sim.pc),
            None => eprintln!("error: {e}\n  at pc {:#010x}", sim.pc),
        }
        std::process::exit(1);
    }
    Ok(())
}
